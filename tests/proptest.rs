use axum::http::{Method, StatusCode};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::{Value, json};

use garden::account::{Account, Identity};
use garden::paginate::{PAGE_SIZE, paginate};
use garden::permission::has_permission;
use garden::{MAX_DEGREE, MIN_DEGREE, check_coordinate, check_non_negative, check_not_future_at};

mod common;

use common::{GardenTest, path_of};

/// Property test strategies for generating test data
pub mod strategies {
    use super::*;
    use proptest::string::string_regex;

    pub fn method_strategy() -> impl Strategy<Value = Method> {
        prop_oneof![
            Just(Method::GET),
            Just(Method::HEAD),
            Just(Method::OPTIONS),
            Just(Method::PATCH),
            Just(Method::POST),
            Just(Method::PUT),
            Just(Method::DELETE),
            Just(Method::TRACE),
            Just(Method::CONNECT),
        ]
    }

    /// Anonymous, ordinary or superuser visitors.
    pub fn identity_strategy() -> impl Strategy<Value = Identity> {
        prop_oneof![
            Just(None),
            any::<bool>().prop_map(Some),
        ]
        .prop_map(|superuser| match superuser {
            None => Identity::Anonymous,
            Some(superuser) => Identity::Account(
                Account::with_iterations("visitor", "pw", superuser, 1).unwrap(),
            ),
        })
    }

    pub fn name_strategy() -> impl Strategy<Value = String> {
        string_regex(r"[A-Z][a-z]{2,20}").unwrap()
    }

    /// Page parameters as a browser might send them.
    pub fn page_parameter_strategy() -> impl Strategy<Value = Option<String>> {
        proptest::option::of(prop_oneof![
            (0usize..40).prop_map(|n| n.to_string()),
            Just("last".to_string()),
            string_regex(r"[a-z0-9-]{0,6}").unwrap(),
        ])
    }
}

proptest! {
    #[test]
    fn coordinates_inside_the_bound_are_accepted(value in MIN_DEGREE..=MAX_DEGREE) {
        prop_assert!(check_coordinate(value).is_ok());
    }

    #[test]
    fn coordinates_outside_the_bound_are_rejected(excess in 1e-6f64..1e6) {
        prop_assert!(check_coordinate(MAX_DEGREE + excess).is_err());
        prop_assert!(check_coordinate(MIN_DEGREE - excess).is_err());
    }

    #[test]
    fn altitude_sign_decides(value in -1e6f64..1e6) {
        prop_assert_eq!(check_non_negative(value).is_ok(), value >= 0.0);
    }

    #[test]
    fn timestamps_after_now_are_rejected(offset in -1_000_000i64..1_000_000) {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let timestamp = now + Duration::seconds(offset);
        prop_assert_eq!(check_not_future_at(&timestamp, &now).is_ok(), offset <= 0);
    }

    #[test]
    fn permission_rule(
        method in strategies::method_strategy(),
        identity in strategies::identity_strategy(),
    ) {
        let allowed = has_permission(&method, &identity);
        let expected = match (&identity, &method) {
            (Identity::Anonymous, _) => false,
            (_, m) if [Method::GET, Method::HEAD, Method::OPTIONS, Method::PATCH].contains(m) => true,
            (Identity::Account(account), m) if [Method::POST, Method::PUT, Method::DELETE].contains(m) => {
                account.is_superuser
            }
            _ => false,
        };
        prop_assert_eq!(allowed, expected);
    }

    #[test]
    fn pages_always_land_in_range(
        count in 0usize..120,
        requested in strategies::page_parameter_strategy(),
    ) {
        let page = paginate((0..count).collect::<Vec<_>>(), PAGE_SIZE, requested.as_deref());
        prop_assert_eq!(page.num_pages, count.div_ceil(PAGE_SIZE).max(1));
        prop_assert!(page.number >= 1 && page.number <= page.num_pages);
        prop_assert!(page.items.len() <= PAGE_SIZE);
        prop_assert_eq!(page.count, count);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10))]

    #[test]
    fn taxon_creation_roundtrip(
        genus in strategies::name_strategy(),
        species in strategies::name_strategy(),
        family in proptest::option::of(strategies::name_strategy()),
    ) {
        tokio::runtime::Runtime::new().unwrap().block_on(async {
            let garden = GardenTest::new().await;
            let created = garden
                .as_admin(Method::POST, "/api/taxons/")
                .json(&json!({ "genus": genus, "species": species, "family": family }))
                .await;
            prop_assert_eq!(created.status_code(), StatusCode::CREATED);
            let created: Value = created.json();

            let fetched = garden
                .as_user(Method::GET, &path_of(created["url"].as_str().unwrap()))
                .await;
            fetched.assert_status_ok();
            let fetched: Value = fetched.json();
            prop_assert_eq!(&fetched, &created);
            prop_assert_eq!(&fetched["genus"], &json!(genus));
            prop_assert_eq!(&fetched["family"], &json!(family));

            let listed: Vec<Value> = garden.as_user(Method::GET, "/api/taxons/").await.json();
            prop_assert_eq!(listed.len(), 1);
            Ok(())
        }).unwrap()
    }

    #[test]
    fn out_of_range_coordinates_never_persist(latitude in 180.001f64..10_000.0) {
        tokio::runtime::Runtime::new().unwrap().block_on(async {
            let garden = GardenTest::new().await;
            let response = garden
                .as_admin(Method::POST, "/api/coords/")
                .json(&json!({ "longitude": 0.0, "latitude": latitude }))
                .await;
            prop_assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
            let errors: Value = response.json();
            prop_assert!(errors.get("latitude").is_some());
            let listed: Vec<Value> = garden.as_user(Method::GET, "/api/coords/").await.json();
            prop_assert!(listed.is_empty());
            Ok(())
        }).unwrap()
    }
}
