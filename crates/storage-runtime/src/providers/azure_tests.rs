//! Tests for the Azure Storage provider implementation.

use super::*;

// ============================================================================
// Configuration Tests
// ============================================================================

mod configuration_tests {
    use super::*;

    #[test]
    fn test_connection_string_parsing() {
        let config = AzureStorageConfig::from_connection_string(
            "DefaultEndpointsProtocol=https;AccountName=worker;AccountKey=dGVzdC1rZXk=;EndpointSuffix=core.windows.net",
        )
        .unwrap();

        assert_eq!(config.account, "worker");
        assert_eq!(config.access_key, "dGVzdC1rZXk=");
        assert_eq!(config.endpoint_suffix, "core.windows.net");
        assert_eq!(
            config.queue_base_url(),
            "https://worker.queue.core.windows.net"
        );
        assert_eq!(
            config.blob_base_url(),
            "https://worker.blob.core.windows.net"
        );
    }

    #[test]
    fn test_connection_string_endpoint_overrides() {
        let config = AzureStorageConfig::from_connection_string(
            "AccountName=devstoreaccount1;AccountKey=a2V5;\
             QueueEndpoint=http://127.0.0.1:10001/devstoreaccount1/;\
             BlobEndpoint=http://127.0.0.1:10000/devstoreaccount1/",
        )
        .unwrap();

        assert_eq!(
            config.queue_base_url(),
            "http://127.0.0.1:10001/devstoreaccount1"
        );
        assert_eq!(
            config.blob_base_url(),
            "http://127.0.0.1:10000/devstoreaccount1"
        );
    }

    #[test]
    fn test_connection_string_missing_account_rejected() {
        let result = AzureStorageConfig::from_connection_string("AccountKey=a2V5");
        assert!(matches!(result, Err(StorageError::Configuration { .. })));
    }

    #[test]
    fn test_connection_string_missing_key_rejected() {
        let result = AzureStorageConfig::from_connection_string("AccountName=worker");
        assert!(matches!(result, Err(StorageError::Configuration { .. })));
    }

    #[test]
    fn test_account_key_preserves_base64_padding() {
        // AccountKey values end in '='; only the first '=' splits key/value
        let config =
            AzureStorageConfig::from_connection_string("AccountName=worker;AccountKey=dGVzdA==")
                .unwrap();
        assert_eq!(config.access_key, "dGVzdA==");
    }
}

// ============================================================================
// Signing Tests
// ============================================================================

mod signing_tests {
    use super::*;

    #[test]
    fn test_signer_rejects_invalid_key() {
        let result = SharedKeySigner::new("worker", "not base64!!");
        assert!(matches!(
            result,
            Err(StorageError::AuthenticationFailed { .. })
        ));
    }

    #[test]
    fn test_authorization_header_shape() {
        let signer = SharedKeySigner::new("worker", "dGVzdC1rZXk=").unwrap();

        let authorization = signer
            .authorization(
                &Method::GET,
                0,
                None,
                "x-ms-date:Mon, 27 Jul 2026 12:28:27 GMT\nx-ms-version:2021-08-06\n",
                "/worker/work-items/messages",
            )
            .unwrap();

        assert!(authorization.starts_with("SharedKey worker:"));
        // HMAC-SHA256 output is 32 bytes, 44 characters of base64
        let signature = authorization.trim_start_matches("SharedKey worker:");
        assert_eq!(signature.len(), 44);
    }

    #[test]
    fn test_authorization_is_deterministic() {
        let signer = SharedKeySigner::new("worker", "dGVzdC1rZXk=").unwrap();
        let headers = "x-ms-date:Mon, 27 Jul 2026 12:28:27 GMT\nx-ms-version:2021-08-06\n";

        let first = signer
            .authorization(&Method::PUT, 42, Some("application/xml"), headers, "/worker/q")
            .unwrap();
        let second = signer
            .authorization(&Method::PUT, 42, Some("application/xml"), headers, "/worker/q")
            .unwrap();
        let different = signer
            .authorization(&Method::PUT, 43, Some("application/xml"), headers, "/worker/q")
            .unwrap();

        assert_eq!(first, second);
        assert_ne!(first, different);
    }

    #[test]
    fn test_rfc1123_date_format() {
        let date = rfc1123_now();
        assert!(date.ends_with(" GMT"));
        // "Mon, 27 Jul 2026 12:28:27 GMT"
        assert_eq!(date.len(), 29);
    }
}

// ============================================================================
// XML Parsing Tests
// ============================================================================

mod parsing_tests {
    use super::*;

    #[test]
    fn test_parse_message_list() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<QueueMessagesList>
  <QueueMessage>
    <MessageId>5974b586-0df3-4e2d-ad0c-18e3892bfca2</MessageId>
    <InsertionTime>Fri, 09 Oct 2026 21:04:30 GMT</InsertionTime>
    <ExpirationTime>Fri, 16 Oct 2026 21:04:30 GMT</ExpirationTime>
    <PopReceipt>AgAAAAEAAAAAAAAAtq2q2garzAE=</PopReceipt>
    <TimeNextVisible>Fri, 09 Oct 2026 23:29:20 GMT</TimeNextVisible>
    <DequeueCount>3</DequeueCount>
    <MessageText>cGF5bG9hZA==</MessageText>
  </QueueMessage>
</QueueMessagesList>"#;

        let messages = parse_message_list(xml).unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].receipt.message_id(),
            "5974b586-0df3-4e2d-ad0c-18e3892bfca2"
        );
        assert_eq!(messages[0].receipt.receipt(), "AgAAAAEAAAAAAAAAtq2q2garzAE=");
        assert_eq!(messages[0].body, Bytes::from_static(b"payload"));
        assert_eq!(messages[0].dequeue_count, 3);
    }

    #[test]
    fn test_parse_message_list_empty() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?><QueueMessagesList />"#;
        let messages = parse_message_list(xml).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_parse_message_list_invalid_base64_rejected() {
        let xml = "<QueueMessagesList><QueueMessage>\
                   <MessageId>id</MessageId><PopReceipt>r</PopReceipt>\
                   <MessageText>@@not-base64@@</MessageText>\
                   </QueueMessage></QueueMessagesList>";

        let result = parse_message_list(xml);
        assert!(matches!(result, Err(StorageError::InvalidResponse { .. })));
    }

    #[test]
    fn test_parse_queue_list_with_marker() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://worker.queue.core.windows.net/">
  <Queues>
    <Queue><Name>work-items</Name></Queue>
    <Queue><Name>work-results</Name></Queue>
  </Queues>
  <NextMarker>work-z</NextMarker>
</EnumerationResults>"#;

        let (names, marker) = parse_name_list(xml, b"Queue").unwrap();

        assert_eq!(names, vec!["work-items", "work-results"]);
        assert_eq!(marker, Some("work-z".to_string()));
    }

    #[test]
    fn test_parse_blob_list_without_marker() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults>
  <Blobs>
    <Blob><Name>2026-08-09/q1/b1</Name><Properties /></Blob>
    <Blob><Name>2026-08-09/q1/b2</Name><Properties /></Blob>
  </Blobs>
  <NextMarker />
</EnumerationResults>"#;

        let (names, marker) = parse_name_list(xml, b"Blob").unwrap();

        assert_eq!(names, vec!["2026-08-09/q1/b1", "2026-08-09/q1/b2"]);
        assert_eq!(marker, None);
    }

    #[test]
    fn test_parse_error_fields() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<Error>
  <Code>QueueNotFound</Code>
  <Message>The specified queue does not exist.</Message>
</Error>"#;

        let (code, message) = parse_error_fields(xml);

        assert_eq!(code.as_deref(), Some("QueueNotFound"));
        assert_eq!(
            message.as_deref(),
            Some("The specified queue does not exist.")
        );
    }
}

// ============================================================================
// Error Mapping Tests
// ============================================================================

mod error_mapping_tests {
    use super::*;

    fn response(status: StatusCode, body: &str) -> RawResponse {
        RawResponse {
            status,
            headers: header::HeaderMap::new(),
            body: Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    #[test]
    fn test_queue_not_found_mapping() {
        let name = QueueName::new("work".to_string()).unwrap();
        let body = "<Error><Code>QueueNotFound</Code><Message>missing</Message></Error>";

        let error = queue_error(&name, &response(StatusCode::NOT_FOUND, body));

        assert!(matches!(error, StorageError::QueueNotFound { .. }));
        assert!(error.is_not_found());
    }

    #[test]
    fn test_queue_being_deleted_is_transient() {
        let name = QueueName::new("work".to_string()).unwrap();
        let body = "<Error><Code>QueueBeingDeleted</Code><Message>wait</Message></Error>";

        let error = queue_error(&name, &response(StatusCode::CONFLICT, body));

        assert!(matches!(error, StorageError::ResourceBusy { .. }));
        assert!(error.is_transient());
    }

    #[test]
    fn test_unauthorized_maps_to_authentication_failure() {
        let name = QueueName::new("work".to_string()).unwrap();

        let error = queue_error(&name, &response(StatusCode::FORBIDDEN, ""));

        assert!(matches!(error, StorageError::AuthenticationFailed { .. }));
    }

    #[test]
    fn test_blob_error_code_from_header() {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-ms-error-code",
            header::HeaderValue::from_static("BlobNotFound"),
        );
        let response = RawResponse {
            status: StatusCode::NOT_FOUND,
            headers,
            body: Bytes::new(),
        };

        let error = blob_error("overflow", Some("a/b/c"), &response);

        assert!(matches!(error, StorageError::BlobNotFound { .. }));
    }

    #[test]
    fn test_blob_404_without_code_falls_back_by_target() {
        let name_level = blob_error(
            "overflow",
            Some("a/b/c"),
            &response(StatusCode::NOT_FOUND, ""),
        );
        let container_level = blob_error("overflow", None, &response(StatusCode::NOT_FOUND, ""));

        assert!(matches!(name_level, StorageError::BlobNotFound { .. }));
        assert!(matches!(
            container_level,
            StorageError::ContainerNotFound { .. }
        ));
    }

    #[test]
    fn test_server_error_maps_to_service_error() {
        let name = QueueName::new("work".to_string()).unwrap();
        let body = "<Error><Code>InternalError</Code><Message>boom</Message></Error>";

        let error = queue_error(&name, &response(StatusCode::INTERNAL_SERVER_ERROR, body));

        assert!(matches!(error, StorageError::ServiceError { .. }));
        assert!(error.is_transient());
    }
}
