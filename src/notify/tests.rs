// src/notify/tests.rs

#[cfg(test)]
mod tests {
    use crate::services::notify::{EmailRelay, NotificationService, NotifyError, SmsRelay};
    use crate::testing::TestApp;
    use async_trait::async_trait;
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CapturingEmail {
        sent: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl EmailRelay for CapturingEmail {
        async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Email("mailbox unavailable".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string(), text.to_string()));
            Ok(())
        }
    }

    struct FixedSms;

    #[async_trait]
    impl SmsRelay for FixedSms {
        async fn send(&self, _to: &str, _body: &str) -> Result<String, NotifyError> {
            Ok("SM42".to_string())
        }
    }

    #[tokio::test]
    async fn test_email_requires_recipient() {
        let app = TestApp::new();
        let (status, body) = app
            .call(Method::POST, "/api/notify/email", None, Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Field 'to' (email) is required");

        let (status, _) = app
            .call(Method::POST, "/api/notify/email", None, Some(json!({ "to": 42 })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_email_rejects_bad_address() {
        let app = TestApp::new();
        let (status, body) = app
            .call(
                Method::POST,
                "/api/notify/email",
                None,
                Some(json!({ "to": "nobody@localhost" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid email address");
    }

    #[tokio::test]
    async fn test_email_without_relay_is_logged_only() {
        let app = TestApp::new();
        let (status, body) = app
            .call(
                Method::POST,
                "/api/notify/email",
                None,
                Some(json!({ "to": "a@b.co" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "status": "ok",
                "sent": false,
                "note": "Email relay not configured; logged only"
            })
        );
    }

    #[tokio::test]
    async fn test_email_relay_gets_defaults() {
        let relay = Arc::new(CapturingEmail::default());
        let app = TestApp::with_notifier(NotificationService::new(Some(relay.clone()), None));

        let (status, body) = app
            .call(
                Method::POST,
                "/api/notify/email",
                None,
                Some(json!({ "to": "a@b.co", "subject": 7 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "sent": true }));

        let sent = relay.sent.lock().unwrap();
        assert_eq!(sent[0].1, "Notification Activated");
        assert_eq!(
            sent[0].2,
            "Good Day Sir/Ma you successfully activated email service"
        );
    }

    #[tokio::test]
    async fn test_email_relay_failure_is_500() {
        let relay = Arc::new(CapturingEmail {
            fail: true,
            ..Default::default()
        });
        let app = TestApp::with_notifier(NotificationService::new(Some(relay), None));
        let (status, _) = app
            .call(
                Method::POST,
                "/api/notify/email",
                None,
                Some(json!({ "to": "a@b.co" })),
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_sms_paths() {
        let app = TestApp::new();
        let (status, body) = app
            .call(Method::POST, "/api/notify/sms", None, Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Field 'to' (phone) is required");

        let (_, body) = app
            .call(
                Method::POST,
                "/api/notify/sms",
                None,
                Some(json!({ "to": "+15550001111" })),
            )
            .await;
        assert_eq!(body["sent"], false);
        assert_eq!(body["note"], "SMS provider not configured; logged only");

        let app = TestApp::with_notifier(NotificationService::new(None, Some(Arc::new(FixedSms))));
        let (status, body) = app
            .call(
                Method::POST,
                "/api/notify/sms",
                None,
                Some(json!({ "to": "+15550001111" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "sent": true, "sid": "SM42" }));
    }
}
