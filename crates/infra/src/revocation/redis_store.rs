//! Redis-backed revocation list.
//!
//! Logout lives in another service, which writes `blacklist:<token>` with a
//! TTL. The gateway only reads: presence of the key means revoked.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::debug;

use zyra_auth::{RevocationStore, StoreUnavailable, revocation_key};

#[derive(Clone)]
pub struct RedisRevocationStore {
    conn: ConnectionManager,
}

impl core::fmt::Debug for RedisRevocationStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RedisRevocationStore").finish_non_exhaustive()
    }
}

impl RedisRevocationStore {
    pub async fn connect(redis_url: impl AsRef<str>) -> Result<Self, StoreUnavailable> {
        let client = redis::Client::open(redis_url.as_ref()).map_err(|e| StoreUnavailable(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreUnavailable(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn is_revoked(&self, raw: &str) -> Result<bool, StoreUnavailable> {
        let mut conn = self.conn.clone();
        let present: bool = conn
            .exists(revocation_key(raw))
            .await
            .map_err(|e| StoreUnavailable(e.to_string()))?;
        debug!(present, "revocation lookup");
        Ok(present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::net::tcp::OwnedReadHalf;

    /// One RESP array of bulk strings, or `None` once the client hangs up.
    async fn read_command(reader: &mut BufReader<OwnedReadHalf>) -> Option<Vec<String>> {
        let mut line = String::new();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let argc: usize = line.trim_end().strip_prefix('*')?.parse().ok()?;
        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc {
            line.clear();
            reader.read_line(&mut line).await.ok()?;
            line.clear();
            reader.read_line(&mut line).await.ok()?;
            args.push(line.trim_end().to_string());
        }
        Some(args)
    }

    /// Minimal Redis stand-in: `EXISTS` answers from the key name, every other
    /// command (connection setup) gets `+OK`.
    async fn fake_redis() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { return };
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut reader = BufReader::new(read);
                    while let Some(args) = read_command(&mut reader).await {
                        let reply: &[u8] = match args.first().map(|c| c.to_ascii_uppercase()) {
                            Some(cmd) if cmd == "EXISTS" => {
                                let key = args.get(1).map(String::as_str).unwrap_or_default();
                                if key.contains("broken") {
                                    b"-ERR boom\r\n"
                                } else if key.contains("revoked") {
                                    b":1\r\n"
                                } else {
                                    b":0\r\n"
                                }
                            }
                            _ => b"+OK\r\n",
                        };
                        if write.write_all(reply).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });
        format!("redis://{addr}/")
    }

    #[tokio::test]
    async fn invalid_url_is_store_unavailable() {
        let err = RedisRevocationStore::connect("not a redis url").await.unwrap_err();
        assert!(!err.0.is_empty());
    }

    #[tokio::test]
    async fn exists_reply_maps_to_revocation_answer() {
        let store = RedisRevocationStore::connect(fake_redis().await).await.unwrap();

        assert_eq!(store.is_revoked("revoked-token").await, Ok(true));
        assert_eq!(store.is_revoked("live-token").await, Ok(false));
    }

    #[tokio::test]
    async fn server_error_is_store_unavailable() {
        let store = RedisRevocationStore::connect(fake_redis().await).await.unwrap();

        let err = store.is_revoked("broken-token").await.unwrap_err();
        assert!(err.0.contains("boom"), "unexpected error: {err}");
    }
}
