#![no_main]

use amqp_bind::auth::SaslPlainCredentials;
use libfuzzer_sys::arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;

#[derive(Debug)]
struct PlainInput {
    authzid: Option<String>,
    username: String,
    password: String,
}

impl<'a> Arbitrary<'a> for PlainInput {
    fn arbitrary(u: &mut Unstructured<'a>) -> libfuzzer_sys::arbitrary::Result<Self> {
        Ok(Self {
            authzid: u.arbitrary()?,
            username: u.arbitrary()?,
            password: u.arbitrary()?,
        })
    }
}

fuzz_target!(|input: PlainInput| {
    let mut creds = SaslPlainCredentials::new(input.username.clone(), input.password.clone());
    if let Some(authzid) = input.authzid.clone() {
        creds = creds.authzid(authzid);
    }

    let has_nul = input.username.contains('\0')
        || input.password.contains('\0')
        || input.authzid.as_deref().is_some_and(|z| z.contains('\0'));

    match creds.initial_response() {
        Ok(response) => {
            assert!(!has_nul);
            assert_eq!(response.iter().filter(|b| **b == 0).count(), 2);
        }
        Err(_) => assert!(has_nul),
    }
});
