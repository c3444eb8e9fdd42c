#![allow(dead_code)]

use std::path::Path;

use nobel::{JsonPrizeStore, Laureate, Prize, Prizes, Role, StaticCredentials};

pub const ADMIN: (&str, &str) = ("admin", "1234");
pub const READER: (&str, &str) = ("reader", "reader");

/// three prizes, the highest laureate id is 10
pub fn sample_prizes() -> Prizes {
    let mut physics = Prize::new(
        2023,
        "physics",
        vec![laureate(7, "Pierre", "Agostini"), laureate(8, "Ferenc", "Krausz")],
    );
    physics.overall_motivation = Some("for experimental methods".to_string());

    Prizes {
        prizes: vec![
            physics,
            Prize::new(2023, "chemistry", vec![laureate(10, "Moungi", "Bawendi")]),
            Prize::new(2022, "Economics", vec![laureate(9, "Ben", "Bernanke")]),
        ],
    }
}

pub fn laureate(id: u64, firstname: &str, surname: &str) -> Laureate {
    Laureate {
        id,
        ..Laureate::new(firstname, surname)
    }
}

/// a store over a fresh data file holding `sample_prizes()`
pub fn sample_store(dir: &Path) -> JsonPrizeStore {
    JsonPrizeStore::create_with(&dir.join("bd.json"), sample_prizes()).expect("unable to create store")
}

/// the users the gateway accepts in tests
pub fn gateway_credentials() -> StaticCredentials {
    StaticCredentials::new()
        .with_user(ADMIN.0, ADMIN.1, Role::Admin)
        .with_user(READER.0, READER.1, Role::Reader)
}

/// the service account the gateway uses against the backend
pub fn backend_credentials() -> StaticCredentials {
    StaticCredentials::new()
        .with_user("gateway", "gateway-secret", Role::Admin)
        .with_user(READER.0, READER.1, Role::Reader)
}
