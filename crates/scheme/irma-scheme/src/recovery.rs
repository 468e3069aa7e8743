//! Restoring disabled scheme managers, and seeding storage from the assets.
//!
//! Recovery runs per disabled manager: first a reinstall from the manager's
//! remote URL, then a copy from the assets folder. Either source is verified
//! completely before it replaces anything in storage.

use crate::configuration::Configuration;
use crate::error::{ConfigurationError, Result, SchemeManagerError, SchemeManagerStatus};
use crate::fetcher::{FetchError, SchemeFetcher};
use crate::fs;
use crate::index::{
    is_plain_relative, verify_index_signature, SchemeManagerIndex, INDEX_FILE,
    INDEX_SIGNATURE_FILE, PUBLIC_KEY_FILE,
};
use crate::manager::{load_scheme_manager, read_description, read_timestamp, read_trust_anchor};
use irma_crypto::{decode_verifying_key, encode_verifying_key, sha256, VerifyingKey};
use irma_types::SchemeManagerIdentifier;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

impl Configuration {
    /// [`parse_folder`](Self::parse_folder), and if that disabled any
    /// manager, try to restore each one from its remote URL and then from
    /// the assets before parsing again.
    ///
    /// Succeeds only when no manager is left disabled. Otherwise the error of
    /// the first parse is returned and the configuration keeps whatever
    /// state the final parse produced.
    pub async fn parse_or_restore_folder(&mut self) -> Result<()> {
        let original = match self.parse_folder() {
            Ok(()) => return Ok(()),
            Err(ConfigurationError::SchemeManager(e)) => e,
            Err(e) => return Err(e),
        };
        if self.options.read_only {
            return Err(original.into());
        }

        let disabled: Vec<SchemeManagerIdentifier> =
            self.disabled_scheme_managers().keys().cloned().collect();
        for id in &disabled {
            match self.reinstall_from_remote(id).await {
                Ok(()) => {
                    info!(manager = %id, stage = "remote", "restored scheme manager");
                    continue;
                }
                Err(e) => warn!(manager = %id, stage = "remote", error = %e, "scheme manager recovery failed"),
            }
            match self.reinstall_from_assets(id) {
                Ok(()) => info!(manager = %id, stage = "assets", "restored scheme manager"),
                Err(e) => warn!(manager = %id, stage = "assets", error = %e, "scheme manager recovery failed"),
            }
        }

        match self.parse_folder() {
            Ok(()) => Ok(()),
            Err(ConfigurationError::SchemeManager(_)) => Err(original.into()),
            Err(e) => Err(e),
        }
    }

    /// Download manager `id` from its URL, verify it against the trust
    /// anchor and swap it into storage. Bounded by the remote timeout.
    pub async fn reinstall_from_remote(&self, id: &SchemeManagerIdentifier) -> Result<()> {
        if self.options.read_only {
            return Err(ConfigurationError::ReadOnly);
        }
        let fetcher = self
            .fetcher
            .clone()
            .ok_or_else(|| ConfigurationError::NoRecoverySource(id.clone()))?;
        let url = self
            .remote_url(id)
            .ok_or_else(|| ConfigurationError::NoRecoverySource(id.clone()))?;
        let anchor = self.trust_anchor(id);
        let target = self.path.join(id.as_str());
        let staging = fs::staging_path(&target);

        let timeout = self.options.remote_timeout();
        let download = download_scheme_manager(fetcher, id, &url, anchor, &staging);
        let outcome = match tokio::time::timeout(timeout, download).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout).into()),
        };
        if let Err(e) = outcome {
            fs::remove_dir_all(&staging)?;
            return Err(e);
        }

        // verify what was staged exactly as parsing will
        if let Err(failed) = load_scheme_manager(id, &staging) {
            fs::remove_dir_all(&staging)?;
            return Err(failed.error.into());
        }
        fs::swap_in(&staging, &target)
    }

    /// Replace manager `id` in storage by the copy in the assets, provided
    /// that copy verifies.
    pub fn reinstall_from_assets(&self, id: &SchemeManagerIdentifier) -> Result<()> {
        if self.options.read_only {
            return Err(ConfigurationError::ReadOnly);
        }
        let source = self
            .assets_dir(id)
            .ok_or_else(|| ConfigurationError::NoRecoverySource(id.clone()))?;
        load_scheme_manager(id, &source).map_err(|failed| failed.error)?;
        fs::replace_dir_with_copy(&source, &self.path.join(id.as_str()))
    }

    /// Copy every manager from the assets that storage lacks or holds an
    /// older version of.
    pub(crate) fn copy_from_assets(&self) -> Result<()> {
        let Some(assets) = self.options.assets.as_deref() else {
            return Ok(());
        };
        if !assets.is_dir() {
            warn!(assets = %assets.display(), "assets folder not found, skipping autocopy");
            return Ok(());
        }
        for (name, source) in fs::subdirectories(assets)? {
            let target = self.path.join(&name);
            let stored = read_timestamp(&target);
            let shipped = read_timestamp(&source);
            let copy = match (stored, shipped) {
                (None, _) => true,
                (Some(stored), Some(shipped)) => shipped > stored,
                (Some(_), None) => false,
            };
            if copy {
                info!(manager = %name, ?stored, ?shipped, "copying scheme manager from assets");
                fs::replace_dir_with_copy(&source, &target)?;
            }
        }
        Ok(())
    }

    fn assets_dir(&self, id: &SchemeManagerIdentifier) -> Option<PathBuf> {
        let dir = self.options.assets.as_deref()?.join(id.as_str());
        dir.is_dir().then_some(dir)
    }

    /// The distribution URL of `id`: from the parsed description, else from
    /// the assets copy.
    fn remote_url(&self, id: &SchemeManagerIdentifier) -> Option<String> {
        if let Some(manager) = self.scheme_manager(id) {
            if !manager.url.is_empty() {
                return Some(manager.url.clone());
            }
        }
        let dir = self.assets_dir(id)?;
        read_description(id, &dir).ok().map(|m| m.url).filter(|u| !u.is_empty())
    }

    /// The key a downloaded index must be signed with: the assets copy's,
    /// else the stored one. `None` if neither is available.
    fn trust_anchor(&self, id: &SchemeManagerIdentifier) -> Option<VerifyingKey> {
        self.assets_dir(id)
            .and_then(|dir| read_trust_anchor(id, &dir).ok())
            .or_else(|| read_trust_anchor(id, &self.path.join(id.as_str())).ok())
    }
}

async fn download_scheme_manager(
    fetcher: Arc<dyn SchemeFetcher>,
    id: &SchemeManagerIdentifier,
    url: &str,
    anchor: Option<VerifyingKey>,
    staging: &Path,
) -> Result<()> {
    let base = url.trim_end_matches('/');
    let file_url = |rel: &str| format!("{base}/{rel}");
    let invalid = |status, reason: String| -> ConfigurationError {
        SchemeManagerError::new(id, status, reason).into()
    };

    let index_bytes = fetcher.fetch(&file_url(INDEX_FILE)).await?;
    let signature = fetcher.fetch(&file_url(INDEX_SIGNATURE_FILE)).await?;
    let key = match anchor {
        Some(key) => key,
        None => {
            warn!(manager = %id, "no local trust anchor, using the downloaded public key");
            let pk = fetcher.fetch(&file_url(PUBLIC_KEY_FILE)).await?;
            decode_verifying_key(&String::from_utf8_lossy(&pk))
                .map_err(|e| invalid(SchemeManagerStatus::InvalidIndex, e.to_string()))?
        }
    };
    verify_index_signature(&index_bytes, &String::from_utf8_lossy(&signature), &key)
        .map_err(|e| invalid(SchemeManagerStatus::InvalidSignature, e.to_string()))?;
    let index_text = String::from_utf8(index_bytes.clone())
        .map_err(|e| invalid(SchemeManagerStatus::InvalidIndex, e.to_string()))?;
    let index = SchemeManagerIndex::parse(&index_text, id.as_str())
        .map_err(|e| invalid(SchemeManagerStatus::InvalidIndex, e.to_string()))?;

    fs::remove_dir_all(staging)?;
    fs::create_dir_all(staging)?;
    let prefix = format!("{id}/");
    for (path, digest) in index.iter() {
        let target = path
            .strip_prefix(&prefix)
            .filter(|rel| is_plain_relative(Path::new(rel)))
            .map(|rel| (rel, staging.join(rel)))
            .filter(|(_, target)| target.starts_with(staging));
        let Some((rel, target)) = target else {
            return Err(invalid(
                SchemeManagerStatus::InvalidIndex,
                format!("index entry {path} is outside the scheme manager"),
            ));
        };
        let contents = fetcher.fetch(&file_url(rel)).await?;
        if sha256([&contents]) != *digest {
            return Err(invalid(
                SchemeManagerStatus::InvalidSignature,
                format!("downloaded {path} does not match index"),
            ));
        }
        fs::write(&target, &contents)?;
    }
    fs::write(&staging.join(INDEX_FILE), &index_bytes)?;
    fs::write(&staging.join(INDEX_SIGNATURE_FILE), &signature)?;
    fs::write(
        &staging.join(PUBLIC_KEY_FILE),
        format!("{}\n", encode_verifying_key(&key)).as_bytes(),
    )?;
    info!(manager = %id, files = index.len(), "downloaded scheme manager");
    Ok(())
}
