use actix_web::{http::StatusCode, test};
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use serial_test::serial;

use ems::services::notifications::NotificationEvent;

#[macro_use]
mod common;

use common::{bearer, TestContext};

fn new_employee(name: &str, email: &str) -> Value {
    json!({
        "employeeName": name,
        "email": email,
        "contactNumber": "9876501234",
        "joiningDate": "2023-04-03",
        "password": "Joining#2023",
    })
}

#[actix_web::test]
#[serial]
async fn test_manager_creates_employee_with_account() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (manager_token, _) = ctx.manager().await;

    let req = test::TestRequest::post()
        .uri("/api/employees")
        .insert_header(bearer(&manager_token))
        .set_json(new_employee("Meera Iyer", "Meera.Iyer@example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["employeeCode"], "ER0001");
    assert_eq!(body["email"], "meera.iyer@example.com");
    assert_eq!(
        body["leaveBalance"],
        json!({ "casualLeave": 8, "sickLeave": 8, "earnedLeave": 14, "total": 30 })
    );

    // The new account can sign in straight away.
    let (_, actor) = ctx.login("meera.iyer@example.com", "Joining#2023").await;
    assert_eq!(actor.employee_id, Some(serde_json::from_value::<uuid::Uuid>(body["id"].clone()).unwrap()));

    let events = ctx.sink.wait_for(1).await;
    assert_eq!(events.len(), 1);
    let (event, recipient) = &events[0];
    assert_eq!(recipient, "meera.iyer@example.com");
    assert!(matches!(
        event,
        NotificationEvent::EmployeeWelcome { employee_code, .. } if employee_code == "ER0001"
    ));
}

#[actix_web::test]
#[serial]
async fn test_codes_follow_sequence_and_list_is_newest_first() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (admin_token, _) = ctx.admin().await;

    for (name, email) in [("Anil Kumar", "anil@example.com"), ("Bela Das", "bela@example.com")] {
        let req = test::TestRequest::post()
            .uri("/api/employees")
            .insert_header(bearer(&admin_token))
            .set_json(new_employee(name, email))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get()
        .uri("/api/employees")
        .insert_header(bearer(&admin_token))
        .to_request();
    let listed: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["employeeCode"], "ER0002");
    assert_eq!(listed[1]["employeeCode"], "ER0001");
}

#[actix_web::test]
#[serial]
async fn test_create_rejects_invalid_input() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (admin_token, _) = ctx.admin().await;
    let existing = ctx.employee().await;

    let mut letters = new_employee("Chitra", "chitra@example.com");
    letters["contactNumber"] = json!("98765abcde");
    let mut short = new_employee("Chitra", "chitra@example.com");
    short["contactNumber"] = json!("98765");
    let mut future = new_employee("Chitra", "chitra@example.com");
    future["joiningDate"] = json!((Utc::now() + Duration::days(10)).to_rfc3339());
    let bad_email = new_employee("Chitra", "chitra@");
    let duplicate = new_employee("Chitra", &existing.email);

    for (body, message) in [
        (letters, "Contact number must contain only numeric values".to_string()),
        (short, "Contact number must be exactly 10 digits".to_string()),
        (future, "Joining date cannot be a future date".to_string()),
        (bad_email, "Invalid email format. Example: user@example.com".to_string()),
        (
            duplicate,
            format!(
                "An employee with email \"{}\" already exists. Please use a different email address.",
                existing.email
            ),
        ),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/employees")
            .insert_header(bearer(&admin_token))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], json!(message));
    }
}

#[actix_web::test]
#[serial]
async fn test_update_is_partial_and_keeps_balance() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (manager_token, _) = ctx.manager().await;
    let lead = ctx.employee().await;
    let employee = ctx.employee().await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/employees/{}", employee.id))
        .insert_header(bearer(&manager_token))
        .set_json(json!({ "contactNumber": "9000011111", "reportingManager": lead.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["contactNumber"], "9000011111");
    assert_eq!(body["employeeName"], json!(employee.employee_name));
    assert_eq!(body["reportingManager"], json!(lead.id));
    assert_eq!(body["leaveBalance"]["total"], 30);

    // An empty manager clears the link.
    let req = test::TestRequest::put()
        .uri(&format!("/api/employees/{}", employee.id))
        .insert_header(bearer(&manager_token))
        .set_json(json!({ "reportingManager": "" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["reportingManager"], Value::Null);

    for (manager, message) in [
        (json!(employee.id), "An employee cannot report to themselves"),
        (json!(uuid::Uuid::new_v4()), "Reporting manager not found"),
    ] {
        let req = test::TestRequest::put()
            .uri(&format!("/api/employees/{}", employee.id))
            .insert_header(bearer(&manager_token))
            .set_json(json!({ "reportingManager": manager }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], message);
    }
}

#[actix_web::test]
#[serial]
async fn test_submission_notifies_reporting_manager() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (admin_token, _) = ctx.admin().await;
    let lead = ctx.employee().await;
    let employee = ctx.employee().await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/employees/{}", employee.id))
        .insert_header(bearer(&admin_token))
        .set_json(json!({ "reportingManager": lead.id }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let token = ctx.employee_token(&employee).await;
    let req = test::TestRequest::post()
        .uri("/api/leaves")
        .insert_header(bearer(&token))
        .set_json(common::leave_body(employee.id, "Casual Leave", 2))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let events = ctx.sink.wait_for(1).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1, lead.email);
    assert!(matches!(
        &events[0].0,
        NotificationEvent::LeaveSubmitted { employee_name, leave_days: 2, .. }
            if employee_name == &employee.employee_name
    ));
}

#[actix_web::test]
#[serial]
async fn test_unknown_and_malformed_ids() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let (admin_token, _) = ctx.admin().await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/employees/{}", uuid::Uuid::new_v4()))
        .insert_header(bearer(&admin_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Employee not found");

    let req = test::TestRequest::get()
        .uri("/api/employees/not-a-uuid")
        .insert_header(bearer(&admin_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[serial]
async fn test_correlation_id_is_echoed() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/employees")
        .insert_header(("X-Correlation-ID", "trace-42"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.headers()
            .get("x-correlation-id")
            .and_then(|value| value.to_str().ok()),
        Some("trace-42")
    );

    let req = test::TestRequest::get().uri("/api/employees").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.headers().contains_key("x-correlation-id"));
}
