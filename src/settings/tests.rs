// src/settings/tests.rs

#[cfg(test)]
mod tests {
    use super::super::models::*;
    use super::super::services::*;
    use super::super::validators::*;
    use crate::common::{ApiError, Validator};
    use crate::services::FieldValue;
    use crate::testing::{TestApp, ADMIN_EMAIL, ADMIN_TOKEN, ADMIN_UID, USER_TOKEN};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0";
    const LONG_UID: &str = "abcdefghijklmnopqrstuv";

    fn invoice_body(user: &str) -> Value {
        json!({
            "user": user,
            "invoiceNumber": "INV001",
            "date": "2025-08-01",
            "service": "Web Hosting",
            "amount": 50,
            "status": "Paid"
        })
    }

    fn multipart_request(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        let boundary = "XBOUNDARYX";
        let mut body = Vec::new();
        for (name, file_name, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            match file_name {
                Some(file) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, file
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        Request::builder()
            .method(Method::PUT)
            .uri("/api/settings/profile")
            .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    // ---- validators ----

    #[test]
    fn test_parse_invoice_valid() {
        let fields = parse_invoice(&invoice_body("x")).unwrap();
        assert_eq!(fields.invoice_number, "INV001");
        assert_eq!(fields.date.to_string(), "2025-08-01");
        assert_eq!(fields.amount, 50.0);
        assert_eq!(fields.status, InvoiceStatus::Paid);

        let doc = fields.to_document();
        assert_eq!(
            doc["date"],
            FieldValue::Timestamp(Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_invoice_accepts_string_amount() {
        let mut body = invoice_body("x");
        body["amount"] = json!("12.5");
        assert_eq!(parse_invoice(&body).unwrap().amount, 12.5);
    }

    #[test]
    fn test_parse_invoice_missing_fields() {
        for field in ["invoiceNumber", "date", "service", "amount", "status"] {
            let mut body = invoice_body("x");
            body.as_object_mut().unwrap().remove(field);
            match parse_invoice(&body) {
                Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "All fields required"),
                other => panic!("{} missing gave {:?}", field, other),
            }
        }

        let mut body = invoice_body("x");
        body["amount"] = json!(0);
        assert!(matches!(parse_invoice(&body), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_invoice_validator_field_errors() {
        let mut body = invoice_body("x");
        body["status"] = json!("Cancelled");
        body["amount"] = json!(-5);
        body["date"] = json!("08/01/2025");

        let result = InvoiceValidator.validate(&body);
        assert!(!result.is_valid);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["date", "amount", "status"]);
    }

    #[test]
    fn test_parse_new_invoice_requires_user() {
        let mut body = invoice_body("  ");
        assert!(matches!(
            parse_new_invoice(&body),
            Err(ApiError::BadRequest(_))
        ));
        body["user"] = json!("a@b.com");
        let (user, _) = parse_new_invoice(&body).unwrap();
        assert_eq!(user, "a@b.com");
    }

    // ---- helpers ----

    #[test]
    fn test_avatar_key_and_image_detection() {
        assert_eq!(
            avatar_key("u1", 1700000000000, "my photo.png"),
            "adminAvatars/u1/1700000000000_my_photo.png"
        );
        assert_eq!(detect_image(PNG_BYTES), Some("image/png"));
        assert_eq!(detect_image(b"\xFF\xD8\xFF\xE0\0\x10JFIF"), Some("image/jpeg"));
        assert_eq!(detect_image(b"%PDF-1.4 not an image"), None);
        assert_eq!(detect_image(b""), None);
    }

    #[test]
    fn test_pdf_file_name() {
        assert_eq!(pdf_file_name("INV/001"), "001.pdf");
        assert_eq!(pdf_file_name(""), "invoice.pdf");
    }

    // ---- user resolution ----

    #[tokio::test]
    async fn test_resolve_user_id_paths() {
        let app = TestApp::new();
        app.store
            .seed("profiles/p-uid", json!({"email": "pat@example.com"}));
        app.store.seed("users/u-uid", json!({"email": "uma@example.com"}));
        let store = app.state.store.as_ref();

        assert!(matches!(
            resolve_user_id(store, "   ").await,
            Err(ApiError::BadRequest(msg)) if msg == "User ID required"
        ));
        assert_eq!(resolve_user_id(store, LONG_UID).await.unwrap(), LONG_UID);
        assert_eq!(
            resolve_user_id(store, " pat@example.com ").await.unwrap(),
            "p-uid"
        );
        assert_eq!(resolve_user_id(store, "uma@example.com").await.unwrap(), "u-uid");
        assert!(matches!(
            resolve_user_id(store, "short-id").await,
            Err(ApiError::NotFoundDescribed { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_user_id_falls_through_failing_collection() {
        let app = TestApp::new();
        app.store.seed("users/u-uid", json!({"email": "pat@example.com"}));
        app.store.fail_collection("profiles");

        let uid = resolve_user_id(app.state.store.as_ref(), "pat@example.com")
            .await
            .unwrap();
        assert_eq!(uid, "u-uid");
    }

    // ---- invoices over HTTP ----

    #[tokio::test]
    async fn test_invoice_lifecycle() {
        let app = TestApp::new();
        app.store
            .seed("profiles/cust-1", json!({"email": "cust@example.com"}));

        let (status, body) = app
            .call(
                Method::POST,
                "/api/invoices",
                Some(ADMIN_TOKEN),
                Some(invoice_body("cust@example.com")),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let stored = app.store.doc(&format!("invoices/{}", id)).unwrap();
        assert_eq!(stored["userId"], FieldValue::from("cust-1"));
        assert_eq!(stored["amount"], FieldValue::Double(50.0));

        let (status, body) = app
            .call(
                Method::GET,
                "/api/invoices?user=cust@example.com",
                Some(ADMIN_TOKEN),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userId"], "cust-1");
        assert_eq!(body["invoices"][0]["invoiceNumber"], "INV001");
        assert_eq!(body["invoices"][0]["date"], "2025-08-01T00:00:00.000Z");

        let mut edit = invoice_body("ignored");
        edit["status"] = json!("Overdue");
        let (status, _) = app
            .call(
                Method::PUT,
                &format!("/api/invoices/{}", id),
                Some(ADMIN_TOKEN),
                Some(edit),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let stored = app.store.doc(&format!("invoices/{}", id)).unwrap();
        assert_eq!(stored["status"], FieldValue::from("Overdue"));
        assert_eq!(stored["userId"], FieldValue::from("cust-1"));

        let (status, _) = app
            .call(
                Method::DELETE,
                &format!("/api/invoices/{}", id),
                Some(ADMIN_TOKEN),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(app.store.doc(&format!("invoices/{}", id)).is_none());
    }

    #[tokio::test]
    async fn test_create_invoice_rejections() {
        let app = TestApp::new();

        let mut body = invoice_body(LONG_UID);
        body.as_object_mut().unwrap().remove("service");
        let (status, resp) = app
            .call(Method::POST, "/api/invoices", Some(ADMIN_TOKEN), Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["message"], "All fields required");

        let mut body = invoice_body(LONG_UID);
        body["status"] = json!("Void");
        let (status, resp) = app
            .call(Method::POST, "/api/invoices", Some(ADMIN_TOKEN), Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["code"], "VALIDATION_ERROR");

        let (status, resp) = app
            .call(
                Method::POST,
                "/api/invoices",
                Some(ADMIN_TOKEN),
                Some(invoice_body("nobody@example.com")),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(resp["message"], "User not found");
        assert_eq!(resp["description"], "No user with this email.");

        assert!(app.store.collection("invoices").is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_invoice_is_not_found() {
        let app = TestApp::new();
        let (status, _) = app
            .call(
                Method::PUT,
                "/api/invoices/ghost",
                Some(ADMIN_TOKEN),
                Some(invoice_body("x")),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_invoices_requires_user() {
        let app = TestApp::new();
        let (status, body) = app
            .call(Method::GET, "/api/invoices", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "User ID required");
    }

    #[tokio::test]
    async fn test_export_csv() {
        let app = TestApp::new();
        app.store.seed(
            "invoices/i1",
            json!({"userId": LONG_UID, "invoiceNumber": "INV002", "service": "Domain, renewal",
                   "amount": 15, "status": "Pending"}),
        );
        app.store.seed(
            "invoices/other",
            json!({"userId": "someone-else", "invoiceNumber": "INV999"}),
        );

        let request = Request::builder()
            .uri(format!("/api/invoices/export.csv?user={}", LONG_UID))
            .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = app.raw(request).await;

        assert_eq!(status, StatusCode::OK);
        let csv = String::from_utf8(bytes).unwrap();
        assert_eq!(
            csv,
            "Invoice Number,Date,Service,Amount,Status\nINV002,,\"Domain, renewal\",15,Pending"
        );
    }

    #[tokio::test]
    async fn test_invoice_pdf() {
        let app = TestApp::new();
        app.store.seed(
            "invoices/i1",
            json!({"userId": LONG_UID, "invoiceNumber": "INV001", "service": "Hosting",
                   "amount": 50, "status": "Paid"}),
        );

        let request = Request::builder()
            .uri("/api/invoices/i1/pdf")
            .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = app.raw(request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.starts_with(b"%PDF"));

        let (status, _) = app
            .call(Method::GET, "/api/invoices/nope/pdf", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // ---- contacts ----

    #[tokio::test]
    async fn test_contacts_list_and_delete() {
        let app = TestApp::new();
        app.store.seed(
            "contacts/c1",
            json!({"name": "A", "email": "a@x.com", "message": "hi", "createdAt": 1}),
        );
        app.store.seed(
            "contacts/c2",
            json!({"name": "B", "email": "b@x.com", "message": "yo", "createdAt": 2}),
        );

        let (status, body) = app
            .call(Method::GET, "/api/contacts", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "c2");
        assert_eq!(body[1]["id"], "c1");

        let (status, _) = app
            .call(Method::DELETE, "/api/contacts/c1", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.store.collection("contacts").len(), 1);

        let (status, _) = app
            .call(Method::GET, "/api/contacts", Some(USER_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    // ---- profile ----

    #[tokio::test]
    async fn test_get_profile_prefers_document_values() {
        let app = TestApp::new();
        let (status, body) = app
            .call(Method::GET, "/api/settings/profile", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["displayName"], "Admin");
        assert_eq!(body["email"], ADMIN_EMAIL);

        app.store.seed(
            &format!("admins/{}", ADMIN_UID),
            json!({"displayName": "Boss", "photoURL": "", "updatedAt": 5}),
        );
        let (_, body) = app
            .call(Method::GET, "/api/settings/profile", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(body["displayName"], "Boss");
        assert_eq!(body["photoURL"], Value::Null);
        assert_eq!(body["updatedAt"], 5);
    }

    #[tokio::test]
    async fn test_update_profile_with_avatar() {
        let app = TestApp::new();
        let request = multipart_request(&[
            ("displayName", None, &b"New Name"[..]),
            ("avatar", Some("me.png"), PNG_BYTES),
        ]);
        let (status, bytes) = app.raw(request).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&bytes).unwrap();

        let uploads = app.storage.uploads.lock().unwrap().clone();
        assert_eq!(uploads.len(), 1);
        let (key, content_type, _) = &uploads[0];
        assert!(key.starts_with(&format!("adminAvatars/{}/", ADMIN_UID)));
        assert!(key.ends_with("_me.png"));
        assert_eq!(content_type, "image/png");

        let url = format!("https://storage.test/{}", key);
        assert_eq!(body["photoURL"], url.as_str());
        assert_eq!(body["displayName"], "New Name");

        let record = app.identity.user(ADMIN_UID).unwrap();
        assert_eq!(record.display_name.as_deref(), Some("New Name"));
        assert_eq!(record.photo_url.as_deref(), Some(url.as_str()));

        let doc = app.store.doc(&format!("admins/{}", ADMIN_UID)).unwrap();
        assert_eq!(doc["displayName"], FieldValue::from("New Name"));
        assert!(doc["updatedAt"].as_i64().is_some());
    }

    #[tokio::test]
    async fn test_update_profile_empty_name_keeps_provider_name() {
        let app = TestApp::new();
        let (status, _) = app
            .raw(multipart_request(&[("displayName", None, &b"  "[..])]))
            .await;
        assert_eq!(status, StatusCode::OK);

        let doc = app.store.doc(&format!("admins/{}", ADMIN_UID)).unwrap();
        assert_eq!(doc["displayName"], FieldValue::Null);
        assert_eq!(doc["photoURL"], FieldValue::Null);
        // The provider keeps its name when the form sends an empty one
        assert_eq!(
            app.identity.user(ADMIN_UID).unwrap().display_name.as_deref(),
            Some("Admin")
        );
    }

    #[tokio::test]
    async fn test_update_profile_rejects_non_image() {
        let app = TestApp::new();
        let (status, _) = app
            .raw(multipart_request(&[(
                "avatar",
                Some("notes.png"),
                &b"just some text pretending"[..],
            )]))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.storage.uploads.lock().unwrap().is_empty());
        assert!(app.store.doc(&format!("admins/{}", ADMIN_UID)).is_none());
    }

    #[tokio::test]
    async fn test_update_profile_rejects_large_avatar() {
        let app = TestApp::new();
        let mut big = PNG_BYTES.to_vec();
        big.resize(MAX_AVATAR_BYTES + 1, 0);
        let (status, _) = app
            .raw(multipart_request(&[("avatar", Some("big.png"), big.as_slice())]))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.storage.uploads.lock().unwrap().is_empty());
    }

    // ---- password ----

    #[tokio::test]
    async fn test_change_password_flow() {
        let app = TestApp::new();

        let (status, _) = app
            .call(
                Method::POST,
                "/api/settings/password",
                Some(ADMIN_TOKEN),
                Some(json!({"currentPassword": "admin-pass"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .call(
                Method::POST,
                "/api/settings/password",
                Some(ADMIN_TOKEN),
                Some(json!({"currentPassword": "wrong", "newPassword": "secret99"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Current password is incorrect");

        let (status, _) = app
            .call(
                Method::POST,
                "/api/settings/password",
                Some(ADMIN_TOKEN),
                Some(json!({"currentPassword": "admin-pass", "newPassword": "123"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .call(
                Method::POST,
                "/api/settings/password",
                Some(ADMIN_TOKEN),
                Some(json!({"currentPassword": "admin-pass", "newPassword": "secret99"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.identity.password_of(ADMIN_EMAIL).as_deref(), Some("secret99"));
    }
}
