//! End-to-end tests of the REST API over the in-memory stores.

mod common;

use axum::http::{Method, StatusCode, header};
use axum::body::Bytes;
use serde_json::{Value, json};

use std::sync::Arc;

use garden::{AppState, GardenConfig, InMemoryDataStore, LocalObjectStore};

use common::{GardenTest, path_of, payloads};

fn item_path(record: &Value) -> String {
    path_of(record["url"].as_str().unwrap())
}

#[tokio::test]
async fn superuser_has_full_access() {
    let garden = GardenTest::new().await;
    for (collection, payload) in payloads() {
        let list = format!("/api/{}/", collection);

        let created = garden.as_admin(Method::POST, &list).json(&payload).await;
        assert_eq!(created.status_code(), StatusCode::CREATED, "{}", collection);
        let record = created.json::<Value>();
        let item = item_path(&record);
        let location = created.header(header::LOCATION);
        assert!(location.to_str().unwrap().ends_with(&item), "{}", collection);

        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            let response = garden.as_admin(method.clone(), &list).await;
            assert_eq!(response.status_code(), StatusCode::OK, "{} {}", method, list);
            let response = garden.as_admin(method.clone(), &item).await;
            assert_eq!(response.status_code(), StatusCode::OK, "{} {}", method, item);
        }

        let replaced = garden.as_admin(Method::PUT, &item).json(&payload).await;
        assert_eq!(replaced.status_code(), StatusCode::OK, "{}", collection);
        let patched = garden.as_admin(Method::PATCH, &item).json(&payload).await;
        assert_eq!(patched.status_code(), StatusCode::OK, "{}", collection);

        let deleted = garden.as_admin(Method::DELETE, &item).await;
        assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT, "{}", collection);
        let gone = garden.as_admin(Method::GET, &item).await;
        assert_eq!(gone.status_code(), StatusCode::NOT_FOUND, "{}", collection);
    }
}

#[tokio::test]
async fn regular_user_reads_and_patches_only() {
    let garden = GardenTest::new().await;
    for (collection, payload) in payloads() {
        let list = format!("/api/{}/", collection);
        let record = garden.create(collection, payload.clone()).await;
        let item = item_path(&record);

        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            let response = garden.as_user(method.clone(), &list).await;
            assert_eq!(response.status_code(), StatusCode::OK, "{} {}", method, list);
            let response = garden.as_user(method.clone(), &item).await;
            assert_eq!(response.status_code(), StatusCode::OK, "{} {}", method, item);
        }
        let patched = garden.as_user(Method::PATCH, &item).json(&payload).await;
        assert_eq!(patched.status_code(), StatusCode::OK, "{}", collection);

        let created = garden.as_user(Method::POST, &list).json(&payload).await;
        assert_eq!(created.status_code(), StatusCode::FORBIDDEN, "{}", collection);
        let replaced = garden.as_user(Method::PUT, &item).json(&payload).await;
        assert_eq!(replaced.status_code(), StatusCode::FORBIDDEN, "{}", collection);
        let deleted = garden.as_user(Method::DELETE, &item).await;
        assert_eq!(deleted.status_code(), StatusCode::FORBIDDEN, "{}", collection);

        let still_there = garden.as_user(Method::GET, &item).await;
        assert_eq!(still_there.status_code(), StatusCode::OK, "{}", collection);
    }
}

#[tokio::test]
async fn anonymous_requests_are_refused() {
    let garden = GardenTest::new().await;
    for (collection, payload) in payloads() {
        let list = format!("/api/{}/", collection);
        for method in [Method::GET, Method::POST, Method::OPTIONS] {
            let response = garden
                .request(method.clone(), &list, None)
                .json(&payload)
                .await;
            assert_eq!(
                response.status_code(),
                StatusCode::UNAUTHORIZED,
                "{} {}",
                method,
                list
            );
            assert_eq!(response.header(header::WWW_AUTHENTICATE), "Token");
        }
    }
    assert_eq!(garden.state.records.count(garden::RecordKind::Taxon).await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_tokens_fail_authentication() {
    let garden = GardenTest::new().await;
    let response = garden
        .request(Method::GET, "/api/taxons/", Some("not-a-token"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>(), json!({ "detail": "Invalid token." }));
}

#[tokio::test]
async fn api_root_is_public() {
    let garden = GardenTest::new().await;
    let response = garden.server.get("/api/").await;
    response.assert_status_ok();
    let root = response.json::<Value>();
    let root = root.as_object().unwrap();
    assert_eq!(root.len(), 7);
    assert!(root["floras"].as_str().unwrap().ends_with("/api/floras/"));
    assert!(
        root["collect_places"]
            .as_str()
            .unwrap()
            .ends_with("/api/collect_places/")
    );
}

#[tokio::test]
async fn options_describe_writes_to_superusers_only() {
    let garden = GardenTest::new().await;

    let admin = garden.as_admin(Method::OPTIONS, "/api/coords/").await;
    admin.assert_status_ok();
    let admin = admin.json::<Value>();
    assert_eq!(admin["name"], "Coordinate List");
    assert_eq!(admin["actions"]["POST"]["altitude"]["type"], "float");
    assert_eq!(admin["actions"]["POST"]["url"]["read_only"], true);

    let user = garden.as_user(Method::OPTIONS, "/api/coords/").await.json::<Value>();
    assert_eq!(user["name"], "Coordinate List");
    assert!(user.get("actions").is_none());
}

#[tokio::test]
async fn negative_altitude_is_rejected() {
    let garden = GardenTest::new().await;
    let response = garden
        .as_admin(Method::POST, "/api/coords/")
        .json(&json!({ "altitude": -1, "longitude": 21.433, "latitude": 12.343 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let errors = response.json::<Value>();
    assert!(errors.get("altitude").is_some());
    assert_eq!(garden.state.records.count(garden::RecordKind::Coord).await.unwrap(), 0);
}

#[tokio::test]
async fn missing_required_fields_are_reported_per_field() {
    let garden = GardenTest::new().await;
    let response = garden
        .as_admin(Method::POST, "/api/labels/")
        .json(&json!({ "institute": "Russia" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let errors = response.json::<Value>();
    assert_eq!(errors["project"], json!(["This field is required."]));
    assert_eq!(errors["name"], json!(["This field is required."]));
    assert!(errors.get("institute").is_none());
}

#[tokio::test]
async fn links_accept_hyperlinks_and_render_as_hyperlinks() {
    let garden = GardenTest::new().await;
    let taxon = garden
        .create("taxons", json!({ "genus": "Quercus", "species": "robur" }))
        .await;
    let coord = garden
        .create("coords", json!({ "longitude": 37.6, "latitude": 55.7 }))
        .await;
    let place = garden
        .create(
            "collect_places",
            json!({ "country": "Russia", "region": "Moscow", "coord": item_path(&coord) }),
        )
        .await;
    assert_eq!(place["coord"], coord["url"]);

    let flora = garden
        .create(
            "floras",
            json!({
                "author": "Ford",
                "taxonomycol": "Forda",
                "rus_name": "дуб",
                "taxon": taxon["url"],
                "collect_place": place["id"],
            }),
        )
        .await;
    assert_eq!(flora["taxon"], taxon["url"]);
    assert_eq!(flora["collect_place"], place["url"]);
    assert_eq!(flora["local_name"], "дуб");
    assert_eq!(flora["herbarium"], Value::Null);

    let fetched = garden.as_user(Method::GET, &item_path(&flora)).await.json::<Value>();
    assert_eq!(fetched, flora);
}

#[tokio::test]
async fn bad_links_are_field_errors() {
    let garden = GardenTest::new().await;
    let taxon = garden
        .create("taxons", json!({ "genus": "asd", "species": "asd" }))
        .await;

    let wrong_collection = garden
        .as_admin(Method::POST, "/api/floras/")
        .json(&json!({ "author": "Ford", "taxonomycol": "Forda", "comment": taxon["url"] }))
        .await;
    assert_eq!(wrong_collection.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        wrong_collection.json::<Value>()["comment"],
        json!(["Invalid hyperlink - Incorrect URL match."])
    );

    let missing = garden
        .as_admin(Method::POST, "/api/floras/")
        .json(&json!({
            "author": "Ford",
            "taxonomycol": "Forda",
            "taxon": format!("/api/taxons/{}/", uuid::Uuid::new_v4()),
        }))
        .await;
    assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        missing.json::<Value>()["taxon"],
        json!(["Invalid hyperlink - Object does not exist."])
    );

    let garbage = garden
        .as_admin(Method::POST, "/api/floras/")
        .json(&json!({ "author": "Ford", "taxonomycol": "Forda", "taxon": "not a link" }))
        .await;
    assert_eq!(garbage.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        garbage.json::<Value>()["taxon"],
        json!(["Invalid hyperlink - No URL match."])
    );
    assert_eq!(garden.state.records.count(garden::RecordKind::Flora).await.unwrap(), 0);
}

#[tokio::test]
async fn one_to_one_targets_cannot_be_shared() {
    let garden = GardenTest::new().await;
    let taxon = garden
        .create("taxons", json!({ "genus": "asd", "species": "asd" }))
        .await;
    garden
        .create(
            "floras",
            json!({ "author": "Ford", "taxonomycol": "Forda", "taxon": taxon["url"] }),
        )
        .await;
    let second = garden
        .as_admin(Method::POST, "/api/floras/")
        .json(&json!({ "author": "Ford", "taxonomycol": "Forda", "taxon": taxon["url"] }))
        .await;
    assert_eq!(second.status_code(), StatusCode::BAD_REQUEST);
    assert!(second.json::<Value>().get("taxon").is_some());
}

#[tokio::test]
async fn many_labels_may_share_a_plant() {
    let garden = GardenTest::new().await;
    let flora = garden
        .create("floras", json!({ "author": "Ford", "taxonomycol": "Forda" }))
        .await;
    for name in ["first", "second"] {
        let label = garden
            .create(
                "labels",
                json!({ "institute": "Russia", "project": "Moscow", "name": name, "plant": flora["url"] }),
            )
            .await;
        assert_eq!(label["plant"], flora["url"]);
    }
}

#[tokio::test]
async fn deletes_cascade_to_referrers() {
    let garden = GardenTest::new().await;
    let coord = garden
        .create("coords", json!({ "longitude": 1.0, "latitude": 2.0 }))
        .await;
    let place = garden
        .create("collect_places", json!({ "country": "Russia", "region": "Moscow", "coord": coord["url"] }))
        .await;
    let flora = garden
        .create(
            "floras",
            json!({ "author": "Ford", "taxonomycol": "Forda", "collect_place": place["url"] }),
        )
        .await;
    let label = garden
        .create(
            "labels",
            json!({ "institute": "Russia", "project": "Moscow", "name": "forda", "plant": flora["url"] }),
        )
        .await;

    let deleted = garden.as_admin(Method::DELETE, &item_path(&coord)).await;
    assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

    for record in [&place, &flora, &label] {
        let response = garden.as_admin(Method::GET, &item_path(record)).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{}", record["url"]);
    }
}

#[tokio::test]
async fn deleting_a_plant_leaves_no_dangling_labels() {
    let garden = GardenTest::new().await;
    let flora = garden
        .create("floras", json!({ "author": "Ford", "taxonomycol": "Forda" }))
        .await;
    garden
        .create(
            "labels",
            json!({ "institute": "Russia", "project": "Moscow", "name": "forda", "plant": flora["url"] }),
        )
        .await;
    let deleted = garden.as_admin(Method::DELETE, &item_path(&flora)).await;
    assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);
    let labels = garden.as_admin(Method::GET, "/api/labels/").await.json::<Vec<Value>>();
    assert!(labels.is_empty());
}

#[tokio::test]
async fn put_keeps_omitted_fields() {
    let garden = GardenTest::new().await;
    let place = garden
        .create(
            "collect_places",
            json!({ "country": "Russia", "region": "Moscow", "city": "Moscow" }),
        )
        .await;
    let flora = garden
        .create(
            "floras",
            json!({
                "author": "Ford",
                "taxonomycol": "Forda",
                "geo_author": "Geo",
                "created": "2020-01-01T00:00:00Z",
                "collect_place": place["url"],
            }),
        )
        .await;

    let replaced = garden
        .as_admin(Method::PUT, &item_path(&flora))
        .json(&json!({ "author": "Fordd", "taxonomycol": "Forda" }))
        .await;
    replaced.assert_status_ok();
    let replaced = replaced.json::<Value>();
    assert_eq!(replaced["id"], flora["id"]);
    assert_eq!(replaced["author"], "Fordd");
    assert_eq!(replaced["geo_author"], "Geo");
    assert_eq!(replaced["collect_place"], place["url"]);
    assert_eq!(replaced["created"], flora["created"]);

    let incomplete = garden
        .as_admin(Method::PUT, &item_path(&flora))
        .json(&json!({ "author": "Fordd" }))
        .await;
    assert_eq!(incomplete.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        incomplete.json::<Value>()["taxonomycol"],
        json!(["This field is required."])
    );

    let patched = garden
        .as_user(Method::PATCH, &item_path(&place))
        .json(&json!({ "region": "Tver" }))
        .await
        .json::<Value>();
    assert_eq!(patched["country"], "Russia");
    assert_eq!(patched["region"], "Tver");
    assert_eq!(patched["city"], "Moscow");
}

#[tokio::test]
async fn malformed_and_unknown_ids_are_not_found() {
    let garden = GardenTest::new().await;
    let malformed = garden.as_user(Method::GET, "/api/taxons/not-a-uuid/").await;
    assert_eq!(malformed.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(malformed.json::<Value>(), json!({ "detail": "Not found." }));

    let unknown = format!("/api/taxons/{}/", uuid::Uuid::new_v4());
    let unknown = garden.as_user(Method::PATCH, &unknown).json(&json!({})).await;
    assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bodies_must_be_json_objects() {
    let garden = GardenTest::new().await;
    let text = garden
        .as_admin(Method::POST, "/api/taxons/")
        .text("genus=asd")
        .await;
    assert_eq!(text.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let array = garden
        .as_admin(Method::POST, "/api/taxons/")
        .json(&json!(["asd", "asd"]))
        .await;
    assert_eq!(array.status_code(), StatusCode::BAD_REQUEST);
    assert!(array.json::<Value>().get("non_field_errors").is_some());
}

#[tokio::test]
async fn pictures_upload_and_serve() {
    let garden = GardenTest::new().await;
    let flora = garden
        .create("floras", json!({ "author": "Ford", "taxonomycol": "Forda" }))
        .await;
    let upload = format!("{}picture/", item_path(&flora));
    let image = Bytes::from_static(b"\x89PNG fake image");

    let refused = garden
        .as_user(Method::PUT, &upload)
        .add_query_param("filename", "leaf one.png")
        .bytes(image.clone())
        .await;
    assert_eq!(refused.status_code(), StatusCode::FORBIDDEN);

    let empty = garden
        .as_admin(Method::PUT, &upload)
        .add_query_param("filename", "leaf.png")
        .bytes(Bytes::new())
        .await;
    assert_eq!(empty.status_code(), StatusCode::BAD_REQUEST);

    let uploaded = garden
        .as_admin(Method::PUT, &upload)
        .add_query_param("filename", "leaf one.png")
        .bytes(image.clone())
        .await;
    uploaded.assert_status_ok();
    let picture = uploaded.json::<Value>()["picture"].as_str().unwrap().to_string();
    assert!(picture.contains("/media/images/"), "{}", picture);
    assert!(picture.ends_with("-leaf_one.png"), "{}", picture);

    let served = garden.server.get(&path_of(&picture)).await;
    served.assert_status_ok();
    assert_eq!(served.header(header::CONTENT_TYPE), "image/png");
    assert_eq!(served.as_bytes(), &image);

    // Clients cannot overwrite the picture through the JSON API.
    let patched = garden
        .as_admin(Method::PATCH, &item_path(&flora))
        .json(&json!({ "picture": "elsewhere.png", "author": "Fordd" }))
        .await
        .json::<Value>();
    assert_eq!(patched["picture"], picture.as_str());
    assert_eq!(patched["author"], "Fordd");
}

#[tokio::test]
async fn uploads_create_the_image_bucket_on_disk() {
    let media_root = std::env::temp_dir().join(format!("garden-media-{}", uuid::Uuid::new_v4()));
    let records = Arc::new(InMemoryDataStore::new());
    let state = AppState::new(
        records.clone(),
        records,
        Arc::new(LocalObjectStore::new(media_root.clone())),
        GardenConfig::default(),
    );
    let garden = GardenTest::with_state(state).await;
    let flora = garden
        .create("floras", json!({ "author": "Ford", "taxonomycol": "Forda" }))
        .await;

    let uploaded = garden
        .as_admin(Method::PUT, &format!("{}picture/", item_path(&flora)))
        .add_query_param("filename", "leaf.png")
        .bytes(Bytes::from_static(b"png"))
        .await;
    uploaded.assert_status_ok();
    let picture = uploaded.json::<Value>()["picture"].as_str().unwrap().to_string();

    let served = garden.server.get(&path_of(&picture)).await;
    served.assert_status_ok();
    assert_eq!(served.as_bytes().as_ref(), b"png");
    assert!(media_root.join("images").is_dir());

    std::fs::remove_dir_all(&media_root).unwrap();
}

#[tokio::test]
async fn public_url_overrides_the_host() {
    let config = GardenConfig {
        public_url: Some("https://garden.example.org".to_string()),
        ..Default::default()
    };
    let garden = GardenTest::with_config(config).await;
    let taxon = garden
        .create("taxons", json!({ "genus": "asd", "species": "asd" }))
        .await;
    let url = taxon["url"].as_str().unwrap();
    assert!(url.starts_with("https://garden.example.org/api/taxons/"), "{}", url);
}
