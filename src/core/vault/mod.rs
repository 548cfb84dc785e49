use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use anyhow::{Result, anyhow};
use base64::Engine;
use hmac::Mac;
use rusqlite::{Connection, OptionalExtension};
use sha2::Sha256;
use tokio::sync::Mutex;

use crate::core::registration::{OrgInfo, RegistrationReceipt};

type HmacSha256 = hmac::Hmac<Sha256>;

const NONCE_LEN: usize = 12;

/// Non-secret details of a stored registration.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCredential {
    pub email: String,
    pub company_name: String,
    pub org_id: Option<String>,
    pub stored_at: i64,
}

/// Local store for platform access tokens, encrypted at rest.
pub struct CredentialVault {
    db: Arc<Mutex<Connection>>,
    cipher: Aes256Gcm,
}

/// HMAC-SHA256(hostname + username) under a fixed label: stable across
/// restarts, tied to the local machine and user.
fn derive_key() -> Result<[u8; 32]> {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown-host".to_string());
    let username = whoami::username();

    let mut mac = <HmacSha256 as Mac>::new_from_slice(b"llm-onboard-vault-v1")
        .map_err(|e| anyhow!("Vault key derivation failed: {}", e))?;
    mac.update(hostname.as_bytes());
    mac.update(username.as_bytes());

    let mut key = [0u8; 32];
    key.copy_from_slice(&mac.finalize().into_bytes());
    Ok(key)
}

impl CredentialVault {
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let conn = Connection::open(path)?;
        let vault = Self::with_connection(conn)?;
        vault.initialize().await?;
        Ok(vault)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let key = derive_key()?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            cipher,
        })
    }

    async fn initialize(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "CREATE TABLE IF NOT EXISTS org_credentials (
                email TEXT PRIMARY KEY,
                company_name TEXT NOT NULL,
                org_id TEXT,
                token TEXT NOT NULL,
                stored_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// base64(nonce || ciphertext)
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| anyhow!("Encryption failed: {}", e))?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(&combined))
    }

    fn decrypt(&self, encoded: &str) -> Result<String> {
        let combined = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| anyhow!("Base64 decode failed: {}", e))?;
        if combined.len() <= NONCE_LEN {
            return Err(anyhow!("Encrypted value too short"));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| anyhow!("Decryption failed: {}", e))?;
        String::from_utf8(plaintext).map_err(|e| anyhow!("UTF-8 decode failed: {}", e))
    }

    /// Store (or replace) the token issued for `org`.
    pub async fn store(&self, org: &OrgInfo, receipt: &RegistrationReceipt) -> Result<()> {
        let encrypted = self.encrypt(&receipt.access_token)?;
        let stored_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();

        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO org_credentials (email, company_name, org_id, token, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(email) DO UPDATE SET
                company_name=excluded.company_name,
                org_id=excluded.org_id,
                token=excluded.token,
                stored_at=excluded.stored_at",
            (
                org.email.trim(),
                org.company_name.trim(),
                receipt.org_id.as_deref(),
                &encrypted,
                stored_at,
            ),
        )?;
        Ok(())
    }

    pub async fn token(&self, email: &str) -> Result<Option<String>> {
        let stored: Option<String> = {
            let db = self.db.lock().await;
            db.query_row(
                "SELECT token FROM org_credentials WHERE email = ?1",
                [email],
                |row| row.get(0),
            )
            .optional()?
        };
        stored.map(|enc| self.decrypt(&enc)).transpose()
    }

    pub async fn list(&self) -> Result<Vec<StoredCredential>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT email, company_name, org_id, stored_at FROM org_credentials ORDER BY email",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredCredential {
                email: row.get(0)?,
                company_name: row.get(1)?,
                org_id: row.get(2)?,
                stored_at: row.get(3)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn remove(&self, email: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let removed = db.execute("DELETE FROM org_credentials WHERE email = ?1", [email])?;
        Ok(removed > 0)
    }
}
