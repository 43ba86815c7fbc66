//! The token manager.
//!
//! Owns one [`Store`] and one [`CipherMaterial`], validates incoming
//! requests, derives composite keys, and turns plaintexts into tokens and
//! back. The manager depends only on the store contract, never on a
//! concrete backend.

use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
    sync::Arc,
};

use tracing::{debug, error, warn};

use {
    tokenvault_crypto::CipherMaterial,
    tokenvault_store::{Store, StoreError},
};

use crate::{
    error::VaultError,
    keys::{KEY_DELIMITER, composite_key, redact, split_composite},
    model::{
        AllTokens, Child, ChildReceipt, DetokenizeReceipt, DetokenizeRequest, Receipt,
        TokenizeRequest, TokenizeResponse,
    },
};

/// One validation failure, keyed by the composite key that produced it.
#[derive(Debug)]
pub struct ValidationFailure {
    pub key: String,
    pub error: VaultError,
}

/// Coordinates the crypto primitive with a pluggable store.
pub struct Manager {
    store: Arc<dyn Store>,
    material: CipherMaterial,
}

impl Manager {
    /// Construct a manager over `store`, loading the cipher material at
    /// `cipher_path` (generating and persisting it on first use).
    ///
    /// A failed store connection probe is logged but not fatal; the first
    /// operation against the store will surface the real error.
    pub async fn new(store: Arc<dyn Store>, cipher_path: &Path) -> Result<Self, VaultError> {
        match store.connect().await {
            Ok(true) => debug!("store connected"),
            Ok(false) => warn!("store connection probe returned false"),
            Err(e) => warn!(error = %e, "store connection failed"),
        }

        let material = CipherMaterial::load_or_generate(cipher_path)?;
        Ok(Self { store, material })
    }

    /// Construct a manager over already-loaded material.
    pub fn with_material(store: Arc<dyn Store>, material: CipherMaterial) -> Self {
        Self { store, material }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    // ── Per-key operations ───────────────────────────────────────────────

    /// Encrypt `plaintext` and persist the token under `key`. Fails with
    /// `AlreadyExists` when the key is taken.
    pub async fn tokenize(&self, key: &str, plaintext: &str) -> Result<String, VaultError> {
        let token = self.material.encrypt(plaintext)?;
        self.store.store(key, &token).await?;
        debug!(key, "token stored");
        Ok(token)
    }

    /// Verify `presented` against the stored token for `key`, then decrypt.
    ///
    /// The equality check is a second factor beyond possession of the key:
    /// only the exact issued ciphertext unlocks the plaintext.
    pub async fn detokenize(&self, key: &str, presented: &str) -> Result<String, VaultError> {
        let stored = self.store.retrieve(key).await?;
        if stored != presented {
            let redacted = redact(presented);
            error!(key, token = %redacted, "presented token does not match stored token");
            return Err(VaultError::TokenMismatch(redacted));
        }
        Ok(self.material.decrypt(&stored)?)
    }

    /// Re-encrypt `plaintext` and update the existing entry for `key`.
    pub async fn patch_by_id(&self, key: &str, plaintext: &str) -> Result<String, VaultError> {
        let token = self.material.encrypt(plaintext)?;
        self.store.patch(key, &token).await?;
        debug!(key, "token patched");
        Ok(token)
    }

    /// Remove the entry for `id`.
    pub async fn delete_by_id(&self, id: &str) -> Result<bool, VaultError> {
        Ok(self.store.delete(id).await?)
    }

    /// Fetch the stored token for one key, shaped as a response.
    pub async fn token_by_id(&self, id: &str) -> Result<TokenizeResponse, VaultError> {
        let token = self.store.retrieve(id).await?;
        let (parent, child) = split_composite(id);
        Ok(TokenizeResponse {
            id: parent.to_string(),
            data: vec![Child {
                key: child.to_string(),
                value: token,
            }],
        })
    }

    /// Everything in the store, composite keys split and grouped by parent.
    pub async fn all_tokens(&self) -> Result<AllTokens, VaultError> {
        let entries = self.store.retrieve_all().await?;

        let mut groups: BTreeMap<String, Vec<Child>> = BTreeMap::new();
        for (key, token) in entries {
            let (parent, child) = split_composite(&key);
            groups.entry(parent.to_string()).or_default().push(Child {
                key: child.to_string(),
                value: token,
            });
        }

        let tokens = groups
            .into_iter()
            .map(|(id, mut data)| {
                data.sort_by(|a, b| a.key.cmp(&b.key));
                TokenizeResponse { id, data }
            })
            .collect();
        Ok(AllTokens { tokens })
    }

    // ── Request validation ───────────────────────────────────────────────

    /// Validate a whole request, collecting every failure rather than
    /// stopping at the first.
    ///
    /// Duplicate composite keys within the request always fail. Keys that
    /// already exist in the store fail only when `allow_existing` is false
    /// (update operations pass `true`).
    pub async fn validate(
        &self,
        request: &TokenizeRequest,
        allow_existing: bool,
    ) -> (Vec<ValidationFailure>, bool) {
        let mut failures = Vec::new();

        if let Err(error) = check_constituent("id", &request.id) {
            failures.push(ValidationFailure {
                key: request.id.clone(),
                error,
            });
        }

        let mut seen = HashSet::with_capacity(request.data.len());
        for child in &request.data {
            if let Err(error) = check_constituent("key", &child.key) {
                failures.push(ValidationFailure {
                    key: child.key.clone(),
                    error,
                });
                continue;
            }

            let composite = composite_key(&request.id, &child.key);
            if !seen.insert(composite.clone()) {
                failures.push(ValidationFailure {
                    key: composite.clone(),
                    error: VaultError::DuplicateInRequest(composite),
                });
                continue;
            }

            if !allow_existing && self.store.retrieve(&composite).await.is_ok() {
                failures.push(ValidationFailure {
                    key: composite.clone(),
                    error: VaultError::Store(StoreError::AlreadyExists(composite)),
                });
            }
        }

        let verdict = failures.is_empty();
        (failures, verdict)
    }

    // ── Request-level operations ─────────────────────────────────────────
    //
    // Children run in input order; the first processing failure aborts the
    // request. Callers validate first.

    /// Tokenize every child of `request`, mirroring its shape.
    pub async fn process_tokenize(
        &self,
        request: &TokenizeRequest,
    ) -> Result<TokenizeResponse, VaultError> {
        let mut children = Vec::with_capacity(request.data.len());
        for child in &request.data {
            let composite = composite_key(&request.id, &child.key);
            let token = self.tokenize(&composite, &child.value).await?;
            children.push(Child {
                key: child.key.clone(),
                value: token,
            });
        }
        Ok(TokenizeResponse {
            id: request.id.clone(),
            data: children,
        })
    }

    /// Detokenize every child of `request` into receipts.
    pub async fn process_detokenize(
        &self,
        request: &DetokenizeRequest,
    ) -> Result<DetokenizeReceipt, VaultError> {
        let mut receipts = Vec::with_capacity(request.data.len());
        for child in &request.data {
            let composite = composite_key(&request.id, &child.key);
            let datum = self.detokenize(&composite, &child.value).await?;
            receipts.push(ChildReceipt {
                key: child.key.clone(),
                value: Receipt { found: true, datum },
            });
        }
        Ok(DetokenizeReceipt {
            id: request.id.clone(),
            data: receipts,
        })
    }

    /// Re-tokenize every child of `request` through the update path.
    pub async fn process_patch(
        &self,
        request: &TokenizeRequest,
    ) -> Result<TokenizeResponse, VaultError> {
        let mut children = Vec::with_capacity(request.data.len());
        for child in &request.data {
            let composite = composite_key(&request.id, &child.key);
            let token = self.patch_by_id(&composite, &child.value).await?;
            children.push(Child {
                key: child.key.clone(),
                value: token,
            });
        }
        Ok(TokenizeResponse {
            id: request.id.clone(),
            data: children,
        })
    }
}

/// Composite-key constituents are opaque non-empty strings that never
/// contain the delimiter.
fn check_constituent(what: &str, value: &str) -> Result<(), VaultError> {
    if value.is_empty() {
        return Err(VaultError::InvalidRequest(format!("{what} must not be empty")));
    }
    if value.contains(KEY_DELIMITER) {
        return Err(VaultError::InvalidRequest(format!(
            "{what} must not contain the delimiter {KEY_DELIMITER:?}"
        )));
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use tokenvault_store::MemoryStore;

    use super::*;

    const KEY: &str = "abcdefghijklmnopqrstuvwxyzABCDEF";
    const IV: &str = "abcdefghijklmnop";

    fn manager() -> Manager {
        Manager::with_material(
            Arc::new(MemoryStore::new()),
            CipherMaterial::new(KEY, IV),
        )
    }

    fn request(id: &str, pairs: &[(&str, &str)]) -> TokenizeRequest {
        TokenizeRequest {
            id: id.to_string(),
            data: pairs
                .iter()
                .map(|(k, v)| Child {
                    key: k.to_string(),
                    value: v.to_string(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn tokenize_then_detokenize_round_trips() {
        let manager = manager();

        let token = manager.tokenize("u1__ssn", "123-45-6789").await.unwrap();
        let plaintext = manager.detokenize("u1__ssn", &token).await.unwrap();
        assert_eq!(plaintext, "123-45-6789");
    }

    #[tokio::test]
    async fn tokenize_is_stable_for_fixed_material() {
        let manager = manager();

        let first = manager.tokenize("u1__ssn", "123-45-6789").await.unwrap();
        let second = manager.tokenize("u2__ssn", "123-45-6789").await.unwrap();
        // Deterministic cipher: same plaintext, same material, same token.
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn tokenizing_the_same_key_twice_fails() {
        let manager = manager();

        manager.tokenize("u1__ssn", "123-45-6789").await.unwrap();
        let err = manager.tokenize("u1__ssn", "123-45-6789").await.unwrap_err();
        assert!(matches!(
            err,
            VaultError::Store(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn tampered_token_is_a_mismatch() {
        let manager = manager();

        let token = manager.tokenize("u1__ssn", "123-45-6789").await.unwrap();
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        let err = manager.detokenize("u1__ssn", &tampered).await.unwrap_err();
        let VaultError::TokenMismatch(redacted) = err else {
            panic!("expected TokenMismatch, got {err:?}");
        };
        // The error carries only the redacted form.
        assert_eq!(redacted.len(), 10);
        assert!(redacted.ends_with("******"));
    }

    #[tokio::test]
    async fn detokenize_unknown_key_is_not_found() {
        let manager = manager();
        assert!(matches!(
            manager.detokenize("ghost__x", "token").await,
            Err(VaultError::Store(StoreError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn validate_flags_duplicates_within_request() {
        let manager = manager();
        let req = request("a", &[("x", "1"), ("x", "2")]);

        let (failures, verdict) = manager.validate(&req, false).await;
        assert!(!verdict);
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0].error,
            VaultError::DuplicateInRequest(_)
        ));
        assert_eq!(failures[0].key, "a__x");
    }

    #[tokio::test]
    async fn validate_batches_every_existing_key() {
        let manager = manager();
        manager.tokenize("u1__a", "1").await.unwrap();
        manager.tokenize("u1__b", "2").await.unwrap();
        manager.tokenize("u1__c", "3").await.unwrap();

        let req = request("u1", &[("a", "1"), ("b", "2"), ("c", "3")]);
        let (failures, verdict) = manager.validate(&req, false).await;
        assert!(!verdict);
        // All three collisions are reported, not just the first.
        assert_eq!(failures.len(), 3);
    }

    #[tokio::test]
    async fn validate_allows_existing_keys_for_updates() {
        let manager = manager();
        manager.tokenize("u1__a", "1").await.unwrap();

        let req = request("u1", &[("a", "updated")]);
        let (failures, verdict) = manager.validate(&req, true).await;
        assert!(verdict, "unexpected failures: {failures:?}");
    }

    #[tokio::test]
    async fn validate_rejects_delimiter_in_constituents() {
        let manager = manager();

        let (_, verdict) = manager.validate(&request("a__b", &[("x", "1")]), false).await;
        assert!(!verdict);

        let (failures, verdict) = manager.validate(&request("a", &[("x__y", "1")]), false).await;
        assert!(!verdict);
        assert!(matches!(failures[0].error, VaultError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn validate_rejects_empty_constituents() {
        let manager = manager();
        let (_, verdict) = manager.validate(&request("", &[("x", "1")]), false).await;
        assert!(!verdict);
    }

    #[tokio::test]
    async fn process_tokenize_mirrors_request_shape() {
        let manager = manager();
        let req = request("u1", &[("ssn", "123-45-6789"), ("dob", "1970-01-01")]);

        let resp = manager.process_tokenize(&req).await.unwrap();
        assert_eq!(resp.id, "u1");
        assert_eq!(resp.data.len(), 2);
        assert_eq!(resp.data[0].key, "ssn");
        assert_ne!(resp.data[0].value, "123-45-6789");
    }

    #[tokio::test]
    async fn process_detokenize_returns_receipts() {
        let manager = manager();
        let req = request("u1", &[("ssn", "123-45-6789")]);
        let issued = manager.process_tokenize(&req).await.unwrap();

        let back = request("u1", &[("ssn", &issued.data[0].value)]);
        let receipt = manager.process_detokenize(&back).await.unwrap();
        assert_eq!(receipt.data[0].value, Receipt {
            found: true,
            datum: "123-45-6789".into(),
        });
    }

    #[tokio::test]
    async fn process_patch_reencrypts() {
        let manager = manager();
        manager
            .process_tokenize(&request("u1", &[("ssn", "old")]))
            .await
            .unwrap();

        let resp = manager
            .process_patch(&request("u1", &[("ssn", "new")]))
            .await
            .unwrap();
        let plaintext = manager
            .detokenize("u1__ssn", &resp.data[0].value)
            .await
            .unwrap();
        assert_eq!(plaintext, "new");
    }

    #[tokio::test]
    async fn patch_unknown_key_fails() {
        let manager = manager();
        assert!(matches!(
            manager.patch_by_id("ghost__x", "v").await,
            Err(VaultError::Store(StoreError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn all_tokens_groups_by_parent() {
        let manager = manager();
        manager.tokenize("u1__ssn", "a").await.unwrap();
        manager.tokenize("u1__dob", "b").await.unwrap();
        manager.tokenize("u2__ssn", "c").await.unwrap();

        let all = manager.all_tokens().await.unwrap();
        assert_eq!(all.tokens.len(), 2);

        let u1 = all.tokens.iter().find(|t| t.id == "u1").unwrap();
        assert_eq!(u1.data.len(), 2);
        assert_eq!(u1.data[0].key, "dob");
        assert_eq!(u1.data[1].key, "ssn");
    }

    #[tokio::test]
    async fn token_by_id_splits_the_composite() {
        let manager = manager();
        let token = manager.tokenize("u1__ssn", "x").await.unwrap();

        let resp = manager.token_by_id("u1__ssn").await.unwrap();
        assert_eq!(resp.id, "u1");
        assert_eq!(resp.data[0].key, "ssn");
        assert_eq!(resp.data[0].value, token);
    }

    #[tokio::test]
    async fn delete_then_lookup_fails() {
        let manager = manager();
        manager.tokenize("u1__ssn", "x").await.unwrap();

        assert!(manager.delete_by_id("u1__ssn").await.unwrap());
        assert!(matches!(
            manager.token_by_id("u1__ssn").await,
            Err(VaultError::Store(StoreError::NotFound(_)))
        ));
    }
}
