//! Kept in its own test binary: the reject policy below must not race with
//! other tests holding the process-wide registry.

use extload::transpile::registry;
use extload::{
    Export, ExtensionLoader, ExtensionSpec, LoaderError, ProjectDescriptor, ScopePolicy,
    StaticModuleResolver, Transpiler, TranspilerProvider,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

struct Identity;

impl Transpiler for Identity {
    fn name(&self) -> &str {
        "identity"
    }

    fn extensions(&self) -> Vec<String> {
        vec!["id".to_string()]
    }

    fn transpile(&self, _path: &Path, source: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(source.to_vec())
    }
}

struct IdentityProvider;

impl TranspilerProvider for IdentityProvider {
    fn install(&self, _project: &ProjectDescriptor) -> anyhow::Result<Arc<dyn Transpiler>> {
        Ok(Arc::new(Identity))
    }
}

#[tokio::test]
async fn test_failed_batch_leaves_registry_free() {
    let resolver = StaticModuleResolver::new();
    resolver.register("./ok", Export::from(json!("ok")));
    resolver.register_with("./broken", || async {
        Err(anyhow::anyhow!("module init threw"))
    });

    let loader = ExtensionLoader::builder()
        .with_resolver(Arc::new(resolver))
        .with_transpilers(Arc::new(IdentityProvider))
        .with_policy(ScopePolicy::Reject)
        .build();

    let err = loader
        .load_extensions(
            &["./ok", "./broken"].map(ExtensionSpec::from),
            &ProjectDescriptor::new("first.toml"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LoaderError::ModuleLoad { .. }));
    assert_eq!(err.path(), Some(Path::new("./broken")));

    // Released before the error reached us
    assert!(registry().active_project().is_none());
    assert!(registry().lookup("id").is_none());

    // A rejecting loader would fail here if the scope were still held
    let loaded = loader
        .load_extensions(
            &[ExtensionSpec::path("./ok")],
            &ProjectDescriptor::new("second.toml"),
        )
        .await
        .unwrap();
    assert_eq!(loaded[0].as_value(), Some(&json!("ok")));
}
