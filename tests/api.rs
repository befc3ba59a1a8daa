//! End-to-end behaviour through the real router and an in-memory database.

use std::num::NonZeroUsize;

use alumnet::{AppState, db, router, viewer::USER_ID};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt; // for oneshot
use uuid::Uuid;

struct TestApp {
    router: Router,
}

impl TestApp {
    async fn new() -> TestApp {
        let pool = db::memory().await.unwrap();
        TestApp {
            router: router(AppState::new(pool, NonZeroUsize::new(16).unwrap())),
        }
    }

    async fn call(&self, method: Method, uri: &str, user: Option<Uuid>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header(USER_ID, user.to_string());
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get(&self, uri: &str, user: Uuid) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(user), None).await
    }

    async fn post(&self, uri: &str, user: Uuid, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(user), Some(body)).await
    }

    async fn signup(&self, full_name: &str, email: &str, extra: Value) -> Uuid {
        let mut body = json!({
            "fullName": full_name,
            "email": email,
            "major": "Computer Science",
            "graduationYear": 2019,
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            body.extend(extra.clone());
        }
        let (status, created) = self.call(Method::POST, "/p", None, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        created["id"].as_str().unwrap().parse().unwrap()
    }

    /// `from` asks `to` to connect and `to` accepts.
    async fn connect(&self, from: Uuid, to: Uuid) {
        let (status, request) = self.post("/r", from, json!({ "target": to, "kind": "connection" })).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = request["id"].as_str().unwrap();
        let (status, _) = self.post(&format!("/r/{id}/accept"), to, json!({})).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn signup_is_validated() {
    let app = TestApp::new().await;
    app.signup("Jane Doe", "jane@example.com", json!({})).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/p",
            None,
            Some(json!({ "fullName": "J", "email": "nope", "major": "CS", "graduationYear": 1900 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["fields"].as_array().unwrap().iter().map(|f| f["field"].as_str().unwrap()).collect();
    assert!(fields.contains(&"fullName"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"graduationYear"));

    let (status, _) = app
        .call(
            Method::POST,
            "/p",
            None,
            Some(json!({ "fullName": "Jane Again", "email": "JANE@example.com", "major": "Law", "graduationYear": 2020 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn caller_must_identify() {
    let app = TestApp::new().await;
    let jane = app.signup("Jane Doe", "jane@example.com", json!({})).await;

    let (status, _) = app.call(Method::GET, &format!("/p/{jane}"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get(&format!("/p/{jane}"), Uuid::now_v7()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_is_gated_by_relationship() {
    let app = TestApp::new().await;
    let jane = app
        .signup(
            "Jane Doe",
            "jane@example.com",
            json!({ "location": "Kampala", "bio": "Backend engineer", "company": "Acme", "privacy": { "show_location": true } }),
        )
        .await;
    let ben = app.signup("Ben Okello", "ben@example.com", json!({})).await;

    let (status, view) = app.get(&format!("/p/{jane}"), ben).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["relationship"], "public");
    assert_eq!(view["name"], "Jane Doe");
    assert_eq!(view["graduationYear"], 2019);
    assert!(view.get("location").is_none());
    assert!(view.get("bio").is_none());
    assert!(view.get("email").is_none());
    assert!(view.get("privacy").is_none());

    app.connect(ben, jane).await;
    let (_, view) = app.get(&format!("/p/{jane}"), ben).await;
    assert_eq!(view["relationship"], "connection");
    assert_eq!(view["location"], "Kampala");
    assert_eq!(view["bio"], "Backend engineer");
    assert!(view.get("email").is_none());

    let (_, own) = app.get(&format!("/p/{jane}"), jane).await;
    assert_eq!(own["relationship"], "self");
    assert_eq!(own["email"], "jane@example.com");
    assert_eq!(own["privacy"]["location"], true);
    assert_eq!(own["lastSeen"], "Active now");
    assert!(own["completion"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn owner_controls_settings_and_edits() {
    let app = TestApp::new().await;
    let jane = app.signup("Jane Doe", "jane@example.com", json!({})).await;
    let ben = app.signup("Ben Okello", "ben@example.com", json!({})).await;
    let uri = format!("/p/{jane}/privacy");

    let (status, _) = app.call(Method::PUT, &uri, Some(ben), Some(json!({ "email": true }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call(Method::PUT, &uri, Some(jane), Some(json!({ "shoeSize": true }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, resolved) = app.call(Method::PATCH, &uri, Some(jane), Some(json!({ "show_email": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["email"], true);
    assert_eq!(resolved["phone"], false);
    assert_eq!(resolved["allowDirectMessages"], true);

    let (status, _) = app.call(Method::PATCH, &format!("/p/{jane}"), Some(ben), Some(json!({ "bio": "hi" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, view) = app
        .call(Method::PATCH, &format!("/p/{jane}"), Some(jane), Some(json!({ "currentJob": "Engineer" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["currentJob"], "Engineer");
    let (status, _) = app
        .call(Method::PATCH, &format!("/p/{jane}"), Some(jane), Some(json!({ "email": "ben@example.com" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn requests_follow_their_lifecycle() {
    let app = TestApp::new().await;
    let jane = app.signup("Jane Doe", "jane@example.com", json!({})).await;
    let ben = app.signup("Ben Okello", "ben@example.com", json!({})).await;

    let (status, _) = app.post("/r", ben, json!({ "target": ben, "kind": "connection" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post("/r", ben, json!({ "target": jane, "kind": "mentorship" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = app.post("/r", ben, json!({ "target": jane, "kind": "connection", "message": "Hi!" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_owned();
    let (status, _) = app.post("/r", ben, json!({ "target": jane, "kind": "connection" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.post(&format!("/r/{id}/accept"), ben, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, listed) = app.get("/r", jane).await;
    assert_eq!(listed[0]["incoming"], true);
    assert_eq!(listed[0]["status"], "pending");
    assert_eq!(listed[0]["counterpart"], ben.to_string());

    let (status, _) = app.post(&format!("/r/{id}/decline"), jane, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post(&format!("/r/{id}/accept"), jane, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.call(Method::PATCH, &format!("/p/{jane}/privacy"), Some(jane), Some(json!({ "allowMentorRequests": true })))
        .await;
    let (status, created) = app.post("/r", ben, json!({ "target": jane, "kind": "mentorship" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap();
    let cal = app.signup("Cal Nsubuga", "cal@example.com", json!({})).await;
    let (status, _) = app.call(Method::DELETE, &format!("/r/{id}"), Some(cal), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call(Method::DELETE, &format!("/r/{id}"), Some(ben), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // withdrawn requests disappear; answered ones stay
    let (_, listed) = app.get("/r", jane).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["kind"], "connection");
    assert_eq!(listed[0]["status"], "declined");
    let (status, _) = app.call(Method::DELETE, &format!("/r/{id}"), Some(ben), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blocking_hides_everything() {
    let app = TestApp::new().await;
    let jane = app.signup("Jane Doe", "jane@example.com", json!({})).await;
    let ben = app.signup("Ben Okello", "ben@example.com", json!({})).await;

    let (status, _) = app.post("/r", ben, json!({ "target": jane, "kind": "connection" })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.post(&format!("/b/{jane}"), jane, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post(&format!("/b/{ben}"), jane, json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/p/{jane}"), ben).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, found) = app.get("/p?q=jane", ben).await;
    assert_eq!(found, json!([]));
    let (_, listed) = app.get("/r", jane).await;
    assert_eq!(listed, json!([]));
    let (_, listed) = app.get("/r", ben).await;
    assert_eq!(listed, json!([]));
    let (status, _) = app.post("/c", ben, json!({ "participants": [jane] })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call(Method::DELETE, &format!("/b/{ben}"), Some(jane), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/p/{jane}"), ben).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn directory_respects_search_opt_out() {
    let app = TestApp::new().await;
    let jane = app.signup("Jane Doe", "jane@example.com", json!({ "company": "Acme" })).await;
    app.signup("Janet Hidden", "janet@example.com", json!({ "privacy": { "allowAlumniSearch": false } }))
        .await;
    let ben = app.signup("Ben Okello", "ben@example.com", json!({})).await;

    let (_, found) = app.get("/p?q=jan", ben).await;
    let ids: Vec<&str> = found.as_array().unwrap().iter().map(|c| c["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![jane.to_string()]);

    let (_, found) = app.get("/p?q=acme", ben).await;
    assert_eq!(found, json!([]));
    app.connect(ben, jane).await;
    let (_, found) = app.get("/p?q=acme", ben).await;
    assert_eq!(found[0]["headline"], "Acme");

    let (_, found) = app.get("/p?year=2019&major=computer%20science", jane).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn directory_filters_and_pages() {
    let app = TestApp::new().await;
    let viewer = app.signup("Zed Viewer", "zed@example.com", json!({})).await;
    let ada = app
        .signup(
            "Ada Mentor",
            "ada@example.com",
            json!({ "skills": ["Rust"], "graduationYear": 2010, "privacy": { "allowMentorRequests": true } }),
        )
        .await;
    let bea = app.signup("Bea Blocked", "bea@example.com", json!({})).await;
    app.signup("Cy Third", "cy@example.com", json!({ "skills": ["Go"] })).await;

    let (status, _) = app.post(&format!("/b/{viewer}"), bea, json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let names = |found: &Value| -> Vec<String> {
        found.as_array().unwrap().iter().map(|c| c["name"].as_str().unwrap().to_owned()).collect()
    };
    let (_, found) = app.get("/p", viewer).await;
    assert_eq!(names(&found), ["Ada Mentor", "Cy Third"]);
    let (_, found) = app.get("/p?limit=1&offset=1", viewer).await;
    assert_eq!(names(&found), ["Cy Third"]);
    let (_, found) = app.get("/p?mentoring=true", viewer).await;
    assert_eq!(found[0]["id"], ada.to_string());
    assert_eq!(found.as_array().unwrap().len(), 1);
    let (_, found) = app.get("/p?yearFrom=2005&yearTo=2012", viewer).await;
    assert_eq!(names(&found), ["Ada Mentor"]);
    // skills are not public, so a stranger cannot filter on them
    let (_, found) = app.get("/p?skill=rust", viewer).await;
    assert_eq!(found, json!([]));
}

#[tokio::test]
async fn conversation_round_trip() {
    let app = TestApp::new().await;
    let jane = app.signup("Jane Doe", "jane@example.com", json!({})).await;
    let ben = app.signup("Ben Okello", "ben@example.com", json!({})).await;
    let cal = app
        .signup("Cal Nsubuga", "cal@example.com", json!({ "privacy": { "allow_direct_messages": false } }))
        .await;

    let (status, _) = app.post("/c", ben, json!({ "participants": [cal] })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post("/c", ben, json!({ "participants": [ben] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = app.post("/c", ben, json!({ "participants": [jane] })).await;
    assert_eq!(status, StatusCode::CREATED);
    let conv = created["id"].as_str().unwrap().to_owned();
    let (status, again) = app.post("/c", jane, json!({ "participants": [ben] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["id"], conv.as_str());

    let messages = format!("/c/{conv}/messages");
    let (status, _) = app.post(&messages, ben, json!({ "payload": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post(&messages, ben, json!({ "kind": "system", "payload": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post(&messages, cal, json!({ "payload": "let me in" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, sent) = app.post(&messages, ben, json!({ "payload": "Hello Jane" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["kind"], "text");

    let (_, inbox) = app.get("/c", jane).await;
    assert_eq!(inbox[0]["preview"], "Hello Jane");
    assert_eq!(inbox[0]["badge"], "1");
    assert_eq!(inbox[0]["when"], "Just now");

    let (_, listed) = app.get(&messages, jane).await;
    assert_eq!(listed[0]["delivered"], true);
    assert_eq!(listed[0]["read"], false);

    let (_, marked) = app.post(&format!("/c/{conv}/read"), jane, json!({})).await;
    assert_eq!(marked["marked"], 1);
    let (_, inbox) = app.get("/c", jane).await;
    assert!(inbox[0].get("badge").is_none());

    let (_, listed) = app.get(&messages, ben).await;
    assert_eq!(listed[0]["read"], true);

    app.call(Method::PATCH, &format!("/p/{jane}/privacy"), Some(jane), Some(json!({ "allowReadReceipts": false })))
        .await;
    let (_, listed) = app.get(&messages, ben).await;
    assert!(listed[0].get("read").is_none());
    assert_eq!(listed[0]["delivered"], true);
}

#[tokio::test]
async fn group_receipts_are_per_recipient() {
    let app = TestApp::new().await;
    let ava = app.signup("Ava Sender", "ava@example.com", json!({})).await;
    let ben = app.signup("Ben Okello", "ben@example.com", json!({})).await;
    let cal = app.signup("Cal Nsubuga", "cal@example.com", json!({})).await;

    let (status, created) = app.post("/c", ava, json!({ "participants": [ben, cal] })).await;
    assert_eq!(status, StatusCode::CREATED);
    let conv = created["id"].as_str().unwrap().to_owned();
    let messages = format!("/c/{conv}/messages");
    app.post(&messages, ava, json!({ "payload": "hi all" })).await;

    let (_, marked) = app.post(&format!("/c/{conv}/read"), ben, json!({})).await;
    assert_eq!(marked["marked"], 1);

    let (_, inbox) = app.get("/c", cal).await;
    assert_eq!(inbox[0]["unread"], 1);
    let (_, inbox) = app.get("/c", ben).await;
    assert_eq!(inbox[0]["unread"], 0);
    let (_, inbox) = app.get("/c", ava).await;
    assert_eq!(inbox[0]["unread"], 0);

    let (_, listed) = app.get(&messages, cal).await;
    assert_eq!(listed[0]["read"], false);
    let (_, listed) = app.get(&messages, ava).await;
    assert_eq!(listed[0]["delivered"], true);
    assert_eq!(listed[0]["read"], false);

    app.post(&format!("/c/{conv}/read"), cal, json!({})).await;
    let (_, listed) = app.get(&messages, ava).await;
    assert_eq!(listed[0]["read"], true);
}

#[tokio::test]
async fn block_closes_an_existing_conversation() {
    let app = TestApp::new().await;
    let jane = app.signup("Jane Doe", "jane@example.com", json!({})).await;
    let ben = app.signup("Ben Okello", "ben@example.com", json!({})).await;

    let (_, created) = app.post("/c", ben, json!({ "participants": [jane] })).await;
    let messages = format!("/c/{}/messages", created["id"].as_str().unwrap());
    let (status, _) = app.post(&messages, ben, json!({ "payload": "before" })).await;
    assert_eq!(status, StatusCode::CREATED);
    app.post("/n/read", jane, json!({})).await;

    let (status, _) = app.post(&format!("/b/{ben}"), jane, json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.post(&messages, ben, json!({ "payload": "after" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.post(&messages, jane, json!({ "payload": "bye" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, inbox) = app.get("/n", jane).await;
    assert!(inbox.get("badge").is_none());
    let (_, listed) = app.get(&messages, jane).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn notifications_follow_preferences() {
    let app = TestApp::new().await;
    let jane = app.signup("Jane Doe", "jane@example.com", json!({})).await;
    let ben = app.signup("Ben Okello", "ben@example.com", json!({})).await;

    app.post("/r", ben, json!({ "target": jane, "kind": "connection" })).await;
    let (_, created) = app.post("/c", ben, json!({ "participants": [jane] })).await;
    let conv = created["id"].as_str().unwrap();
    app.post(&format!("/c/{conv}/messages"), ben, json!({ "payload": "Hello" })).await;

    let (status, inbox) = app.get("/n", jane).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox["badge"], "2");
    assert_eq!(inbox["notifications"][0]["kind"], "message");
    assert_eq!(inbox["notifications"][0]["title"], "New message from Ben Okello");
    assert_eq!(inbox["notifications"][1]["kind"], "connectionRequest");

    let (_, marked) = app.post("/n/read", jane, json!({})).await;
    assert_eq!(marked["marked"], 2);

    app.call(Method::PATCH, &format!("/p/{jane}/privacy"), Some(jane), Some(json!({ "allowPushNotifications": false })))
        .await;
    app.post(&format!("/c/{conv}/messages"), ben, json!({ "payload": "Still there?" })).await;
    let (_, inbox) = app.get("/n", jane).await;
    assert!(inbox.get("badge").is_none());
    assert_eq!(inbox["notifications"].as_array().unwrap().len(), 2);
}

fn kinds(inbox: &Value) -> Vec<&str> {
    inbox["notifications"].as_array().unwrap().iter().map(|n| n["kind"].as_str().unwrap()).collect()
}

#[tokio::test]
async fn jobs_reach_connections_and_close_by_poster() {
    let app = TestApp::new().await;
    let jane = app.signup("Jane Doe", "jane@example.com", json!({})).await;
    let ben = app.signup("Ben Okello", "ben@example.com", json!({})).await;
    let cal = app.signup("Cal Mugisha", "cal@example.com", json!({})).await;
    app.connect(ben, jane).await;

    let posting = json!({
        "title": "Backend Engineer",
        "company": "Acme",
        "description": "Rust services",
        "jobType": "full-time",
        "experience": "mid",
        "remote": true,
    });
    let (status, created) = app.post("/j", jane, posting).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["notified"], 1);
    let job = created["id"].as_str().unwrap().to_owned();

    let (_, inbox) = app.get("/n", ben).await;
    assert!(kinds(&inbox).contains(&"jobOpportunity"));
    let (_, inbox) = app.get("/n", cal).await;
    assert!(!kinds(&inbox).contains(&"jobOpportunity"));

    let (status, board) = app.get("/j?remote=true", cal).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board[0]["location"], "Remote");
    assert_eq!(board[0]["open"], true);

    let (status, _) = app.call(Method::DELETE, &format!("/j/{job}"), Some(cal), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call(Method::DELETE, &format!("/j/{job}"), Some(jane), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, board) = app.get("/j", cal).await;
    assert_eq!(board, json!([]));
    let (_, closed) = app.get(&format!("/j/{job}"), cal).await;
    assert_eq!(closed["open"], false);

    let (status, _) = app.post("/j", jane, json!({ "title": "", "company": "Acme", "description": "x",
        "jobType": "contract", "experience": "entry" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn events_fill_up_and_invite() {
    let app = TestApp::new().await;
    let jane = app.signup("Jane Doe", "jane@example.com", json!({})).await;
    let ben = app.signup("Ben Okello", "ben@example.com", json!({})).await;
    let cal = app.signup("Cal Mugisha", "cal@example.com", json!({})).await;
    let dee = app.signup("Dee Achieng", "dee@example.com", json!({})).await;

    let starts = (time::OffsetDateTime::now_utc() + time::Duration::days(10)).unix_timestamp() * 1000;
    let event = json!({
        "title": "Class of 2019 Reunion",
        "description": "Ten years on",
        "kind": "reunion",
        "venue": "Main Hall",
        "startsAt": starts,
        "endsAt": starts + 2 * 3_600_000,
        "maxAttendees": 1,
    });
    let (status, created) = app.post("/e", jane, event).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["id"].as_str().unwrap().to_owned();

    let (status, seat) = app.post(&format!("/e/{id}/attend"), ben, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seat["attending"], true);
    assert_eq!(seat["attendance"], "1/1 attending");
    assert_eq!(seat["until"], "In 1 week");
    let (status, _) = app.post(&format!("/e/{id}/attend"), cal, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.post(&format!("/e/{id}/invite"), cal, json!({ "invitees": [dee] })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    app.post(&format!("/b/{ben}"), dee, json!({})).await;
    let (status, invited) = app
        .post(&format!("/e/{id}/invite"), ben, json!({ "invitees": [cal, dee, ben, Uuid::now_v7()] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invited["invited"], 1);
    let (_, inbox) = app.get("/n", cal).await;
    assert_eq!(inbox["notifications"][0]["title"], "Invitation: Class of 2019 Reunion");
    let (_, inbox) = app.get("/n", dee).await;
    assert!(!kinds(&inbox).contains(&"eventInvite"));

    let leave = format!("/e/{id}/attend");
    let (status, _) = app.call(Method::DELETE, &leave, Some(ben), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.call(Method::DELETE, &leave, Some(ben), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, listed) = app.get("/e?kind=reunion", cal).await;
    assert_eq!(listed[0]["spaceLeft"], true);

    let (status, _) = app.post("/e", jane, json!({ "title": "Past", "description": "x", "kind": "social",
        "startsAt": 1_000, "endsAt": 2_000 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
