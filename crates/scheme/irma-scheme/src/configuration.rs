use crate::descriptions::{AttributeType, CredentialType, Issuer, PublicKey, SchemeManager};
use crate::error::{ConfigurationError, Result, SchemeManagerError};
use crate::fetcher::{HttpSchemeFetcher, SchemeFetcher};
use crate::fs;
use crate::manager::{load_scheme_manager, FailedScheme, ParsedScheme};
use crate::metadata::credential_type_hash;
use crate::options::ConfigurationOptions;
use irma_crypto::VerifyingKey;
use irma_revocation::{RevocationError, RevocationStorage, Update};
use irma_types::{
    AttributeTypeIdentifier, CredentialTypeIdentifier, IssuerIdentifier, SchemeManagerIdentifier,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The parsed scheme folder: every trusted scheme manager with its issuers,
/// credential types, attribute types and public keys, plus the revocation
/// state of revocable credential types.
///
/// The structure is always fully linked: every credential type's issuer and
/// every issuer's manager are present. Mutating entry points take `&mut self`;
/// share a configuration between threads behind a read-write lock.
pub struct Configuration {
    pub(crate) path: PathBuf,
    pub(crate) options: ConfigurationOptions,
    pub(crate) fetcher: Option<Arc<dyn SchemeFetcher>>,

    scheme_managers: BTreeMap<SchemeManagerIdentifier, SchemeManager>,
    disabled_scheme_managers: BTreeMap<SchemeManagerIdentifier, SchemeManagerError>,
    issuers: HashMap<IssuerIdentifier, Issuer>,
    credential_types: HashMap<CredentialTypeIdentifier, CredentialType>,
    attribute_types: HashMap<AttributeTypeIdentifier, AttributeType>,
    public_keys: HashMap<IssuerIdentifier, BTreeMap<u32, PublicKey>>,
    reverse_hashes: HashMap<[u8; 16], CredentialTypeIdentifier>,
    credential_indices: HashMap<u32, CredentialTypeIdentifier>,

    revocation: RevocationStorage,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("remote", &self.fetcher.is_some())
            .field("scheme_managers", &self.scheme_managers.keys().collect::<Vec<_>>())
            .field(
                "disabled_scheme_managers",
                &self.disabled_scheme_managers.keys().collect::<Vec<_>>(),
            )
            .field("issuers", &self.issuers.len())
            .field("credential_types", &self.credential_types.len())
            .finish()
    }
}

impl Configuration {
    /// A configuration backed by the scheme folder at `path`.
    ///
    /// Unless read-only, the folder is created if missing and the managers
    /// from `options.assets` are copied in where storage has none or an
    /// older version. Nothing is parsed yet; call
    /// [`parse_folder`](Self::parse_folder) or
    /// [`parse_or_restore_folder`](Self::parse_or_restore_folder).
    pub fn new(path: impl Into<PathBuf>, options: ConfigurationOptions) -> Result<Self> {
        let path = path.into();
        let fetcher: Arc<dyn SchemeFetcher> = Arc::new(HttpSchemeFetcher::new(options.remote_timeout())?);
        let conf = Self {
            revocation: RevocationStorage::with_max_events(options.revocation_max_events),
            path,
            options,
            fetcher: Some(fetcher),
            scheme_managers: BTreeMap::new(),
            disabled_scheme_managers: BTreeMap::new(),
            issuers: HashMap::new(),
            credential_types: HashMap::new(),
            attribute_types: HashMap::new(),
            public_keys: HashMap::new(),
            reverse_hashes: HashMap::new(),
            credential_indices: HashMap::new(),
        };
        if !conf.options.read_only {
            fs::create_dir_all(&conf.path)?;
            if conf.options.assets.is_some() {
                conf.copy_from_assets()?;
            }
        }
        Ok(conf)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &ConfigurationOptions {
        &self.options
    }

    pub fn assets(&self) -> Option<&Path> {
        self.options.assets.as_deref()
    }

    /// Change the assets folder used by later recoveries.
    pub fn set_assets(&mut self, assets: Option<PathBuf>) {
        self.options.assets = assets;
    }

    /// Replace the remote fetcher; `None` disables remote recovery.
    pub fn set_fetcher(&mut self, fetcher: Option<Arc<dyn SchemeFetcher>>) {
        self.fetcher = fetcher;
    }

    fn clear(&mut self) {
        self.scheme_managers.clear();
        self.disabled_scheme_managers.clear();
        self.issuers.clear();
        self.credential_types.clear();
        self.attribute_types.clear();
        self.public_keys.clear();
        self.reverse_hashes.clear();
        self.credential_indices.clear();
    }

    /// Parse every scheme manager in the folder.
    ///
    /// A manager that fails verification or parsing is recorded with its
    /// status in both [`scheme_managers`](Self::scheme_managers) and
    /// [`disabled_scheme_managers`](Self::disabled_scheme_managers); the
    /// other managers load normally. When any manager was disabled the first
    /// such error is returned after the whole folder was processed. I/O
    /// errors on the folder itself abort the parse.
    pub fn parse_folder(&mut self) -> Result<()> {
        let managers = fs::subdirectories(&self.path)?;
        self.clear();

        for (name, dir) in managers {
            let id = SchemeManagerIdentifier::new(name);
            match load_scheme_manager(&id, &dir) {
                Ok(parsed) => self.commit(parsed),
                Err(FailedScheme { manager, error }) => {
                    warn!(manager = %id, status = %error.status, reason = %error.reason, "disabling scheme manager");
                    self.scheme_managers.insert(id.clone(), manager);
                    self.disabled_scheme_managers.insert(id, error);
                }
            }
        }

        info!(
            path = %self.path.display(),
            managers = self.scheme_managers.len(),
            disabled = self.disabled_scheme_managers.len(),
            credential_types = self.credential_types.len(),
            "parsed scheme folder"
        );
        match self.disabled_scheme_managers.values().next() {
            Some(error) => Err(error.clone().into()),
            None => Ok(()),
        }
    }

    fn commit(&mut self, parsed: ParsedScheme) {
        let ParsedScheme {
            manager,
            issuers,
            credential_types,
            public_keys,
        } = parsed;
        let manager_id = manager.identifier();

        for issuer in issuers {
            self.issuers.insert(issuer.identifier(), issuer);
        }
        for (issuer, key) in public_keys {
            self.public_keys
                .entry(issuer)
                .or_default()
                .insert(key.counter, key);
        }
        for ct in credential_types {
            let id = ct.identifier();
            for (position, attr) in ct.attributes.iter().enumerate() {
                let attr_id = ct.attribute_identifier(attr);
                self.attribute_types.insert(
                    attr_id.clone(),
                    AttributeType {
                        identifier: attr_id,
                        name: attr.name.clone(),
                        optional: attr.optional,
                        index: position,
                    },
                );
            }
            self.reverse_hashes.insert(credential_type_hash(&id), id.clone());
            if let Some(index) = ct.index {
                if let Some(previous) = self.credential_indices.insert(index, id.clone()) {
                    warn!(index, %previous, credential_type = %id, "credential type index reused");
                }
            }
            self.credential_types.insert(id, ct);
        }
        debug!(manager = %manager_id, "scheme manager loaded");
        self.scheme_managers.insert(manager_id, manager);
    }

    pub fn scheme_managers(&self) -> &BTreeMap<SchemeManagerIdentifier, SchemeManager> {
        &self.scheme_managers
    }

    pub fn disabled_scheme_managers(&self) -> &BTreeMap<SchemeManagerIdentifier, SchemeManagerError> {
        &self.disabled_scheme_managers
    }

    pub fn scheme_manager(&self, id: &SchemeManagerIdentifier) -> Option<&SchemeManager> {
        self.scheme_managers.get(id)
    }

    /// Whether `id` loaded and passed verification.
    pub fn is_trusted(&self, id: &SchemeManagerIdentifier) -> bool {
        self.scheme_managers.get(id).is_some_and(|m| m.valid)
    }

    pub fn issuers(&self) -> &HashMap<IssuerIdentifier, Issuer> {
        &self.issuers
    }

    pub fn issuer(&self, id: &IssuerIdentifier) -> Option<&Issuer> {
        self.issuers.get(id)
    }

    pub fn credential_types(&self) -> &HashMap<CredentialTypeIdentifier, CredentialType> {
        &self.credential_types
    }

    pub fn credential_type(&self, id: &CredentialTypeIdentifier) -> Option<&CredentialType> {
        self.credential_types.get(id)
    }

    pub fn attribute_type(&self, id: &AttributeTypeIdentifier) -> Option<&AttributeType> {
        self.attribute_types.get(id)
    }

    pub fn credential_type_by_hash(&self, hash: &[u8; 16]) -> Option<&CredentialType> {
        self.reverse_hashes
            .get(hash)
            .and_then(|id| self.credential_types.get(id))
    }

    pub fn credential_type_by_index(&self, index: u32) -> Option<&CredentialType> {
        self.credential_indices
            .get(&index)
            .and_then(|id| self.credential_types.get(id))
    }

    /// Public key `counter` of `issuer`.
    pub fn public_key(&self, issuer: &IssuerIdentifier, counter: u32) -> Result<&PublicKey> {
        if !self.issuers.contains_key(issuer) {
            return Err(ConfigurationError::UnknownIssuer(issuer.clone()));
        }
        self.public_keys
            .get(issuer)
            .and_then(|keys| keys.get(&counter))
            .ok_or_else(|| ConfigurationError::UnknownPublicKey {
                issuer: issuer.clone(),
                counter,
            })
    }

    /// Known key counters of `issuer`, ascending.
    pub fn public_key_counters(&self, issuer: &IssuerIdentifier) -> Vec<u32> {
        self.public_keys
            .get(issuer)
            .map(|keys| keys.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn latest_public_key(&self, issuer: &IssuerIdentifier) -> Option<&PublicKey> {
        self.public_keys
            .get(issuer)
            .and_then(|keys| keys.values().next_back())
    }

    pub fn revocation(&self) -> &RevocationStorage {
        &self.revocation
    }

    /// Key that signs the revocation accumulators of `typ` under key `counter`.
    pub fn revocation_key(
        &self,
        typ: &CredentialTypeIdentifier,
        counter: u32,
    ) -> Result<VerifyingKey> {
        let ct = self
            .credential_type(typ)
            .ok_or_else(|| ConfigurationError::UnknownCredentialType(typ.clone()))?;
        let issuer = ct.issuer_identifier();
        let no_key = || ConfigurationError::NoRevocationKey {
            issuer: issuer.clone(),
            counter,
        };
        if !ct.revocation {
            return Err(no_key());
        }
        match self.public_key(&issuer, counter)?.revocation_verifying_key() {
            Some(Ok(key)) => Ok(key),
            Some(Err(e)) => Err(RevocationError::from(e).into()),
            None => Err(no_key()),
        }
    }

    /// Verify `update` against the issuer's revocation key and insert it into
    /// the revocation store. Returns whether the stored state changed.
    pub fn insert_revocation_update(
        &self,
        typ: &CredentialTypeIdentifier,
        update: &Update,
    ) -> Result<bool> {
        let key = self.revocation_key(typ, update.pk_counter())?;
        update.verify(&key)?;
        Ok(self.revocation.insert(typ, update))
    }
}
