//! Export values produced by extension modules
//!
//! Every module resolves to a single primary [`Export`]: either plain data or
//! something that can be invoked. The invocability check lives here and
//! nowhere else.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Arguments passed to a callable export
#[derive(Debug, Clone, PartialEq)]
pub enum CallArgs {
    /// Zero-argument invocation
    Empty,
    /// Single-argument invocation; the argument itself may be absent
    Options(Option<serde_json::Value>),
}

/// An invocable export (factory or handler)
#[async_trait]
pub trait Callable: Send + Sync {
    /// Invoke the export
    async fn call(&self, args: CallArgs) -> anyhow::Result<Export>;
}

/// Primary export value of a module
#[derive(Clone)]
pub enum Export {
    /// Plain data, used as an already-constructed instance
    Value(serde_json::Value),
    /// Something that can be invoked
    Callable(Arc<dyn Callable>),
}

/// An instantiated extension handed to the caller
pub type LoadedExtension = Export;

impl Export {
    /// Wrap an async closure as a callable export
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Export>> + Send + 'static,
    {
        Export::Callable(Arc::new(FnCallable(f)))
    }

    /// Whether this export can be invoked
    pub fn is_callable(&self) -> bool {
        matches!(self, Export::Callable(_))
    }

    /// The data held by a value export
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Export::Value(value) => Some(value),
            Export::Callable(_) => None,
        }
    }

    /// Consume into the data held by a value export
    pub fn into_value(self) -> Option<serde_json::Value> {
        match self {
            Export::Value(value) => Some(value),
            Export::Callable(_) => None,
        }
    }

    /// Invoke a callable export. Calling a value export is an error.
    pub async fn call(&self, args: CallArgs) -> anyhow::Result<Export> {
        match self {
            Export::Callable(callable) => callable.call(args).await,
            Export::Value(_) => Err(anyhow::anyhow!("export is not callable")),
        }
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Export::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Export::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

impl From<serde_json::Value> for Export {
    fn from(value: serde_json::Value) -> Self {
        Export::Value(value)
    }
}

struct FnCallable<F>(F);

#[async_trait]
impl<F, Fut> Callable for FnCallable<F>
where
    F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Export>> + Send + 'static,
{
    async fn call(&self, args: CallArgs) -> anyhow::Result<Export> {
        (self.0)(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_from_fn_receives_args() {
        let export = Export::from_fn(|args| async move {
            Ok(Export::Value(match args {
                CallArgs::Empty => json!("empty"),
                CallArgs::Options(options) => json!({ "options": options }),
            }))
        });

        assert!(export.is_callable());
        let out = export.call(CallArgs::Empty).await.unwrap();
        assert_eq!(out.as_value(), Some(&json!("empty")));

        let out = export.call(CallArgs::Options(None)).await.unwrap();
        assert_eq!(out.into_value(), Some(json!({ "options": null })));
    }

    #[tokio::test]
    async fn test_value_is_not_callable() {
        let export = Export::from(json!({ "name": "A" }));
        assert!(!export.is_callable());
        assert!(export.call(CallArgs::Empty).await.is_err());
        assert!(format!("{:?}", export).starts_with("Value("));
    }
}
