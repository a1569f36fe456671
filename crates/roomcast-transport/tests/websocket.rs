//! Integration tests for the WebSocket transport.
//!
//! These spin up a real WebSocket server and client to verify that data
//! actually flows over the wire, including the clean-close and concurrent
//! send/recv contracts the hub relies on.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;

    use roomcast_transport::{
        Connection, Transport, WebSocketTransport,
    };

    /// Helper: connects a tokio-tungstenite client to the given address.
    async fn connect_client(
        addr: std::net::SocketAddr,
    ) -> tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    > {
        let url = format!("ws://{addr}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have addr");

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(addr).await;
        let server_conn =
            server_handle.await.expect("task should complete");

        assert!(server_conn.id().into_inner() > 0);

        // --- Server sends, client receives (as a text frame) ---
        server_conn
            .send(br#"{"type":"PRESENCE","payload":{}}"#)
            .await
            .expect("send should succeed");

        use futures_util::StreamExt;
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(
            msg.into_data().as_ref(),
            br#"{"type":"PRESENCE","payload":{}}"#,
        );

        // --- Client sends, server receives ---
        use futures_util::SinkExt;
        use tokio_tungstenite::tungstenite::Message;
        client_ws
            .send(Message::Text("hello from client".into()))
            .await
            .unwrap();

        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().unwrap();

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(addr).await;
        let server_conn = server_handle.await.unwrap();

        use futures_util::SinkExt;
        use tokio_tungstenite::tungstenite::Message;
        client_ws.send(Message::Close(None)).await.unwrap();

        let result =
            server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_parked() {
        // The hub runs a read pump that sits in recv() while the write
        // pump sends. The split stream must let the send go through even
        // though recv is parked.
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().unwrap();

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(addr).await;
        let server_conn = Arc::new(server_handle.await.unwrap());

        // Park a reader; the client hasn't sent anything yet.
        let reader = {
            let conn = Arc::clone(&server_conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::task::yield_now().await;

        server_conn.send(b"ping").await.expect("send should succeed");

        use futures_util::{SinkExt, StreamExt};
        use tokio_tungstenite::tungstenite::Message;
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"ping");

        // Unblock the reader.
        client_ws
            .send(Message::Text("done".into()))
            .await
            .unwrap();
        let received = reader.await.unwrap().unwrap().unwrap();
        assert_eq!(received, b"done");
    }

    #[tokio::test]
    async fn test_websocket_shutdown_interrupts_pending_accept() {
        use roomcast_transport::TransportError;

        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let handle = transport.shutdown_handle();

        // Park an accept with no client in sight, then pull the plug.
        let accept_task =
            tokio::spawn(async move { transport.accept().await });
        tokio::task::yield_now().await;
        handle.shutdown();

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            accept_task,
        )
        .await
        .expect("accept should return after shutdown")
        .expect("task should complete");
        assert!(matches!(result, Err(TransportError::Shutdown)));
    }
}
