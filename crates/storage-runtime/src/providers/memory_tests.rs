//! Tests for the in-memory storage provider.

use super::*;
use crate::error::StorageError;

fn queue(name: &str) -> QueueName {
    QueueName::new(name.to_string()).unwrap()
}

// ============================================================================
// Queue Service Tests
// ============================================================================

mod queue_tests {
    use super::*;

    #[tokio::test]
    async fn test_put_requires_existing_queue() {
        let service = InMemoryQueueService::new();

        let result = service
            .put_message(&queue("missing"), Bytes::from_static(b"body"))
            .await;

        assert!(matches!(result, Err(StorageError::QueueNotFound { .. })));
    }

    #[tokio::test]
    async fn test_create_queue_is_idempotent() {
        let service = InMemoryQueueService::new();
        let name = queue("work");

        service.create_queue(&name).await.unwrap();
        service.create_queue(&name).await.unwrap();

        assert_eq!(service.approximate_message_count(&name).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_get_delete_round_trip() {
        let service = InMemoryQueueService::new();
        let name = queue("work");
        service.create_queue(&name).await.unwrap();

        service
            .put_message(&name, Bytes::from_static(b"payload"))
            .await
            .unwrap();
        assert_eq!(service.approximate_message_count(&name).await.unwrap(), 1);

        let delivered = service
            .get_messages(&name, 10, Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].body, Bytes::from_static(b"payload"));
        assert_eq!(delivered[0].dequeue_count, 1);

        // Leased messages still count towards the approximate total
        assert_eq!(service.approximate_message_count(&name).await.unwrap(), 1);

        service
            .delete_message(&name, &delivered[0].receipt)
            .await
            .unwrap();
        assert_eq!(service.approximate_message_count(&name).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fifo_order_preserved() {
        let service = InMemoryQueueService::new();
        let name = queue("work");
        service.create_queue(&name).await.unwrap();

        for body in [b"one".as_slice(), b"two", b"three"] {
            service
                .put_message(&name, Bytes::copy_from_slice(body))
                .await
                .unwrap();
        }

        let delivered = service
            .get_messages(&name, 10, Duration::from_secs(30))
            .await
            .unwrap();
        let bodies: Vec<&[u8]> = delivered.iter().map(|m| m.body.as_ref()).collect();
        assert_eq!(bodies, vec![b"one".as_slice(), b"two", b"three"]);
    }

    #[tokio::test]
    async fn test_visibility_timeout_redelivers_and_invalidates_receipt() {
        let service = InMemoryQueueService::new();
        let name = queue("work");
        service.create_queue(&name).await.unwrap();
        service
            .put_message(&name, Bytes::from_static(b"payload"))
            .await
            .unwrap();

        let first = service
            .get_messages(&name, 1, Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        // Nothing to deliver while the lease is live
        let hidden = service
            .get_messages(&name, 1, Duration::from_millis(20))
            .await
            .unwrap();
        assert!(hidden.is_empty());

        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = service
            .get_messages(&name, 1, Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].dequeue_count, 2);

        // The first receipt died with the redelivery
        let stale = service.delete_message(&name, &first[0].receipt).await;
        assert!(matches!(stale, Err(StorageError::ReceiptRejected { .. })));

        service
            .delete_message(&name, &second[0].receipt)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_with_unknown_receipt_rejected() {
        let service = InMemoryQueueService::new();
        let name = queue("work");
        service.create_queue(&name).await.unwrap();

        let result = service
            .delete_message(&name, &PopReceipt::new("ghost", "r1"))
            .await;

        assert!(matches!(result, Err(StorageError::ReceiptRejected { .. })));
    }

    #[tokio::test]
    async fn test_clear_removes_visible_and_leased() {
        let service = InMemoryQueueService::new();
        let name = queue("work");
        service.create_queue(&name).await.unwrap();
        service
            .put_message(&name, Bytes::from_static(b"a"))
            .await
            .unwrap();
        service
            .put_message(&name, Bytes::from_static(b"b"))
            .await
            .unwrap();
        service
            .get_messages(&name, 1, Duration::from_secs(30))
            .await
            .unwrap();

        service.clear_messages(&name).await.unwrap();

        assert_eq!(service.approximate_message_count(&name).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_queue_missing_reports_not_found() {
        let service = InMemoryQueueService::new();

        let result = service.delete_queue(&queue("missing")).await;

        assert!(matches!(result, Err(StorageError::QueueNotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_queues_filters_by_prefix() {
        let service = InMemoryQueueService::new();
        for name in ["worker-a", "worker-b", "other"] {
            service.create_queue(&queue(name)).await.unwrap();
        }

        let names = service.list_queues("worker-").await.unwrap();

        let listed: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(listed, vec!["worker-a", "worker-b"]);
    }

    #[tokio::test]
    async fn test_oversize_message_rejected() {
        let service = InMemoryQueueService::with_max_message_size(16);
        let name = queue("work");
        service.create_queue(&name).await.unwrap();

        let result = service
            .put_message(&name, Bytes::from(vec![0u8; 32]))
            .await;

        assert!(matches!(
            result,
            Err(StorageError::MessageTooLarge { size: 32, .. })
        ));
    }
}

// ============================================================================
// Blob Service Tests
// ============================================================================

mod blob_tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_requires_existing_container() {
        let service = InMemoryBlobService::new();

        let result = service
            .upload_blob("missing", "blob", Bytes::from_static(b"data"))
            .await;

        assert!(matches!(
            result,
            Err(StorageError::ContainerNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_upload_download_round_trip() {
        let service = InMemoryBlobService::new();
        service.create_container("overflow").await.unwrap();

        service
            .upload_blob("overflow", "a/b/c", Bytes::from_static(b"data"))
            .await
            .unwrap();

        let downloaded = service.download_blob("overflow", "a/b/c").await.unwrap();
        assert_eq!(downloaded, Some(Bytes::from_static(b"data")));
        assert!(service.blob_exists("overflow", "a/b/c").await.unwrap());
    }

    #[tokio::test]
    async fn test_download_missing_blob_is_none() {
        let service = InMemoryBlobService::new();
        service.create_container("overflow").await.unwrap();

        assert_eq!(service.download_blob("overflow", "ghost").await.unwrap(), None);
        assert_eq!(service.download_blob("no-container", "ghost").await.unwrap(), None);
        assert!(!service.blob_exists("overflow", "ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_blob_reports_existence() {
        let service = InMemoryBlobService::new();
        service.create_container("overflow").await.unwrap();
        service
            .upload_blob("overflow", "blob", Bytes::from_static(b"data"))
            .await
            .unwrap();

        assert!(service.delete_blob("overflow", "blob").await.unwrap());
        assert!(!service.delete_blob("overflow", "blob").await.unwrap());
        assert!(!service.delete_blob("no-container", "blob").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_blobs_filters_by_prefix() {
        let service = InMemoryBlobService::new();
        service.create_container("overflow").await.unwrap();
        for name in ["2026-08-09/q1/a", "2026-08-09/q1/b", "2026-08-09/q2/c"] {
            service
                .upload_blob("overflow", name, Bytes::from_static(b"x"))
                .await
                .unwrap();
        }

        let names = service.list_blobs("overflow", "2026-08-09/q1/").await.unwrap();
        assert_eq!(names, vec!["2026-08-09/q1/a", "2026-08-09/q1/b"]);

        let all = service.list_blobs("overflow", "").await.unwrap();
        assert_eq!(all.len(), 3);

        assert!(service.list_blobs("no-container", "").await.unwrap().is_empty());
    }
}
