mod common;

use anyhow::Result;
use assert_matches::assert_matches;
use common::{init_tracing, storage_copy, testdata};
use irma_crypto::SigningKey;
use irma_revocation::{RevocationError, Update};
use irma_scheme::{
    Configuration, ConfigurationError, ConfigurationOptions, CredentialTypeReference,
    MetadataAttribute, SchemeManagerStatus,
};
use irma_types::{
    AttributeTypeIdentifier, CredentialTypeIdentifier, Int, IssuerIdentifier,
    SchemeManagerIdentifier,
};

fn read_only() -> ConfigurationOptions {
    ConfigurationOptions {
        read_only: true,
        ..Default::default()
    }
}

fn parsed(name: &str) -> Result<Configuration> {
    let mut conf = Configuration::new(testdata(name), read_only())?;
    conf.parse_folder()?;
    Ok(conf)
}

#[test]
fn test_parse_irma_configuration() -> Result<()> {
    init_tracing();
    let conf = parsed("irma_configuration")?;

    let demo = SchemeManagerIdentifier::from("irma-demo");
    assert!(conf.is_trusted(&demo));
    assert_eq!(conf.scheme_managers().len(), 2);
    assert!(conf.disabled_scheme_managers().is_empty());
    let manager = conf.scheme_manager(&demo).unwrap();
    assert_eq!(manager.name.get("en"), Some("Irma Demo"));
    assert_eq!(manager.timestamp, Some(1500000000));
    assert_eq!(manager.timestamp_servers.len(), 1);

    let ru = conf.issuer(&IssuerIdentifier::from("irma-demo.RU")).unwrap();
    assert_eq!(ru.name.get("en"), Some("Demo Radboud University Nijmegen"));
    assert_eq!(ru.identifier().scheme_manager(), demo);

    let card = conf
        .credential_type(&CredentialTypeIdentifier::from("irma-demo.RU.studentCard"))
        .unwrap();
    assert_eq!(card.short_name.get("en"), Some("Student Card"));
    assert!(!card.singleton);
    assert_eq!(
        card.index_of(&AttributeTypeIdentifier::from("irma-demo.RU.studentCard.studentID")),
        Some(2)
    );

    let root = conf
        .credential_type(&CredentialTypeIdentifier::from("irma-demo.MijnOverheid.root"))
        .unwrap();
    assert!(root.singleton);
    assert!(root.revocation);

    let prefix = conf
        .attribute_type(&AttributeTypeIdentifier::from("irma-demo.MijnOverheid.fullName.prefix"))
        .unwrap();
    assert!(prefix.optional);
    assert_eq!(prefix.index, 1);
    Ok(())
}

#[test]
fn test_parse_invalid_irma_configuration() -> Result<()> {
    init_tracing();
    let storage = storage_copy("irma_configuration_invalid");
    let mut conf = Configuration::new(storage.path(), ConfigurationOptions::default())?;
    conf.set_fetcher(None);

    let demo = SchemeManagerIdentifier::from("irma-demo");
    let err = conf.parse_folder().unwrap_err();
    assert_matches!(
        err,
        ConfigurationError::SchemeManager(ref e) if e.status == SchemeManagerStatus::InvalidSignature && e.manager == demo
    );

    // the manager stays visible, but contributes nothing
    let manager = conf.scheme_manager(&demo).unwrap();
    assert_eq!(manager.status, SchemeManagerStatus::InvalidSignature);
    assert!(!manager.valid);
    assert!(!conf.is_trusted(&demo));
    assert!(conf.disabled_scheme_managers().contains_key(&demo));
    assert!(conf.issuers().is_empty());
    assert!(conf.credential_types().is_empty());
    Ok(())
}

#[test]
fn test_public_key_lookup() -> Result<()> {
    let conf = parsed("irma_configuration")?;
    let ru = IssuerIdentifier::from("irma-demo.RU");

    assert_eq!(conf.public_key(&ru, 2)?.counter, 2);
    assert_matches!(
        conf.public_key(&ru, 1),
        Err(ConfigurationError::UnknownPublicKey { counter: 1, .. })
    );
    assert_matches!(
        conf.public_key(&IssuerIdentifier::from("irma-demo.Nobody"), 0),
        Err(ConfigurationError::UnknownIssuer(_))
    );
    Ok(())
}

#[test]
fn test_metadata_compatibility() -> Result<()> {
    let conf = parsed("irma_configuration")?;

    // metadata attribute of a studentCard issued with metadata version 2
    let value = Int::from_decimal("49043481832371145193140299771658227036446546573739245068")?;
    let metadata = MetadataAttribute::from_int(&value)?;
    assert_eq!(metadata.version(), 0x02);
    assert_matches!(metadata.credential_type_reference(), CredentialTypeReference::Hash(_));

    let card = metadata.credential_type(&conf).expect("credential type resolves");
    assert_eq!(card.identifier().as_str(), "irma-demo.RU.studentCard");
    assert!(conf
        .public_key(&card.issuer_identifier(), u32::from(metadata.key_counter()))
        .is_ok());
    assert_eq!(metadata.signing_date().timestamp(), 1499904000);
    assert!(metadata.is_expired());
    Ok(())
}

#[test]
fn test_indexed_metadata_resolves_by_index() -> Result<()> {
    let conf = parsed("irma_configuration")?;
    let root = conf
        .credential_type(&CredentialTypeIdentifier::from("irma-demo.MijnOverheid.root"))
        .unwrap();

    let mut metadata = MetadataAttribute::new(0x04)?;
    metadata.set_credential_type(root)?;
    metadata.set_key_counter(2);
    let decoded = MetadataAttribute::from_int(&metadata.to_int()?)?;
    assert_eq!(decoded.credential_type_reference(), CredentialTypeReference::Index(2));
    assert_eq!(decoded.credential_type(&conf).unwrap().identifier(), root.identifier());
    Ok(())
}

#[test]
fn test_revocation_updates_are_verified() -> Result<()> {
    let conf = parsed("irma_configuration")?;
    let root = CredentialTypeIdentifier::from("irma-demo.MijnOverheid.root");
    let issuer_key = SigningKey::from_bytes(&[3u8; 32]);

    let update = Update::initial(&issuer_key, 2, Int::from_u64(0x1234_5678))?;
    assert!(conf.insert_revocation_update(&root, &update)?);
    assert_eq!(conf.revocation().tip(&root, 2), Some(0));
    // idempotent
    assert!(!conf.insert_revocation_update(&root, &update)?);

    let forged = Update::initial(&SigningKey::from_bytes(&[9u8; 32]), 2, Int::from_u64(7))?;
    assert_matches!(
        conf.insert_revocation_update(&root, &forged),
        Err(ConfigurationError::Revocation(RevocationError::Signature(_)))
    );

    // key 0 of MijnOverheid has no revocation key
    let old_key = Update::initial(&issuer_key, 0, Int::from_u64(7))?;
    assert_matches!(
        conf.insert_revocation_update(&root, &old_key),
        Err(ConfigurationError::NoRevocationKey { counter: 0, .. })
    );

    // studentCard is not revocable at all
    assert_matches!(
        conf.revocation_key(&CredentialTypeIdentifier::from("irma-demo.RU.studentCard"), 2),
        Err(ConfigurationError::NoRevocationKey { .. })
    );
    assert_matches!(
        conf.revocation_key(&CredentialTypeIdentifier::from("irma-demo.RU.nope"), 2),
        Err(ConfigurationError::UnknownCredentialType(_))
    );
    Ok(())
}

#[test]
fn test_options_from_toml() -> Result<()> {
    let options = ConfigurationOptions::from_toml_str(
        r#"
        assets = "/usr/share/irma"
        remote_timeout_secs = 5
        "#,
    )?;
    assert_eq!(options.remote_timeout_secs, 5);
    assert!(!options.read_only);
    assert_eq!(options.assets.as_deref(), Some(std::path::Path::new("/usr/share/irma")));
    assert_matches!(
        ConfigurationOptions::from_toml_str("read_only = 3"),
        Err(ConfigurationError::Options(_))
    );
    Ok(())
}
