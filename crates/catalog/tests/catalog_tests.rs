use fitpass_rust_auth::{Session, SessionStore, UserRecord};
use fitpass_rust_catalog::{CatalogClient, CatalogError, NewReview};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn anonymous_client(server: &MockServer) -> CatalogClient {
    CatalogClient::new(&server.uri(), reqwest::Client::new(), SessionStore::new())
}

fn signed_in_client(server: &MockServer, token: &str) -> CatalogClient {
    let session = SessionStore::new();
    session.set(Session {
        access_token: token.to_string(),
        user: UserRecord {
            id: "u1".to_string(),
            name: "Member".to_string(),
            email: "member@example.com".to_string(),
            phone: None,
            role: None,
        },
    });
    CatalogClient::new(&server.uri(), reqwest::Client::new(), session)
}

#[tokio::test]
async fn test_list_gyms() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gyms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "_id": "g1",
                "name": "Iron Temple",
                "location": "Market St, 3.2 km away",
                "rating": 4.6,
                "reviewCount": 120,
                "specializations": ["CrossFit", "Yoga"],
                "dayPassPrice": 100.0,
                "bestDiscount": 15.0
            },
            { "_id": "g2", "name": "Core Studio" }
        ])))
        .mount(&mock_server)
        .await;

    let catalog = anonymous_client(&mock_server);
    let gyms = catalog.gyms().await.unwrap();

    assert_eq!(gyms.len(), 2);
    assert_eq!(gyms[0].name, "Iron Temple");
    assert_eq!(gyms[0].review_count, 120);
    // Sparse records still decode, with defaults filled in.
    assert_eq!(gyms[1].rating, 0.0);
    assert!(gyms[1].specializations.is_empty());
}

#[tokio::test]
async fn test_plans_for_gym_with_populated_gym_ref() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/plans/gym/g1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "_id": "p1",
                "gym": { "_id": "g1", "name": "Iron Temple", "dayPassPrice": 100.0 },
                "name": "Quarterly",
                "price": 1000.0,
                "discount": 20.0,
                "sessions": 12,
                "duration": "3 months",
                "features": ["Sauna", "Locker"]
            },
            {
                "_id": "p2",
                "gym": "g1",
                "name": "Monthly",
                "price": 400.0,
                "sessions": 4,
                "duration": "1 month"
            }
        ])))
        .mount(&mock_server)
        .await;

    let catalog = anonymous_client(&mock_server);
    let plans = catalog.plans_for_gym("g1").await.unwrap();

    assert_eq!(plans.len(), 2);
    let populated = plans[0].gym.as_ref().and_then(|r| r.populated());
    assert_eq!(populated.map(|g| g.name.as_str()), Some("Iron Temple"));
    assert!(plans[1]
        .gym
        .as_ref()
        .map(|r| !r.is_populated())
        .unwrap_or(false));
}

#[tokio::test]
async fn test_create_review_requires_session() {
    let mock_server = MockServer::start().await;
    let catalog = anonymous_client(&mock_server);

    let result = catalog
        .create_review(&NewReview {
            booking_id: "b1".to_string(),
            gym_id: "g1".to_string(),
            rating: 5,
            comment: "Great".to_string(),
        })
        .await;

    assert!(matches!(result, Err(CatalogError::MissingSession)));
}

#[tokio::test]
async fn test_create_review_sends_bearer_and_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/reviews"))
        .and(header("Authorization", "Bearer review_token"))
        .and(body_partial_json(json!({
            "bookingId": "b1",
            "gymId": "g1",
            "rating": 4
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "r1",
            "rating": 4,
            "comment": "Solid equipment"
        })))
        .mount(&mock_server)
        .await;

    let catalog = signed_in_client(&mock_server, "review_token");
    let review = catalog
        .create_review(&NewReview {
            booking_id: "b1".to_string(),
            gym_id: "g1".to_string(),
            rating: 4,
            comment: "Solid equipment".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(review.id, "r1");
    assert_eq!(review.rating, 4);
}

#[tokio::test]
async fn test_gym_not_found_surfaces_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gyms/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Gym not found" })))
        .mount(&mock_server)
        .await;

    let catalog = anonymous_client(&mock_server);
    match catalog.gym("missing").await {
        Err(CatalogError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Gym not found");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}
