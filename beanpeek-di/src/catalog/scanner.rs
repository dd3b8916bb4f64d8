//! Discovery of managed components by namespace.
//!
//! A namespace is a Rust module path, e.g. `my_app::services`. Scanning a namespace yields the
//! components declared in that module and in all modules nested below it.

use crate::catalog::{ComponentDescriptor, TypeCatalog};
use crate::error::ScanError;
use tracing::{debug, info};

/// Returns descriptors of all components in the given namespace.
pub fn scan(
    catalog: &dyn TypeCatalog,
    namespace: &str,
) -> Result<Vec<ComponentDescriptor>, ScanError> {
    validate_namespace(namespace)?;

    let candidates: Vec<_> = catalog
        .descriptors()
        .into_iter()
        .filter(|descriptor| is_in_namespace(descriptor.namespace, namespace))
        .collect();

    if candidates.is_empty() {
        return Err(ScanError::NamespaceNotFound(namespace.to_string()));
    }

    for candidate in &candidates {
        debug!("Found candidate: {}", candidate.type_name);
    }

    info!(
        "Found {} component(s) in namespace {}",
        candidates.len(),
        namespace
    );

    Ok(candidates)
}

/// Checks if a module path lies in the given namespace.
pub fn is_in_namespace(module_path: &str, namespace: &str) -> bool {
    module_path
        .strip_prefix(namespace)
        .map(|rest| rest.is_empty() || rest.starts_with("::"))
        .unwrap_or(false)
}

fn validate_namespace(namespace: &str) -> Result<(), ScanError> {
    // crate names of examples and tests may start with a digit
    let is_valid_segment = |segment: &str| {
        !segment.is_empty() && segment.chars().all(|c| c.is_alphanumeric() || c == '_')
    };

    if namespace.split("::").all(is_valid_segment) {
        Ok(())
    } else {
        Err(ScanError::InvalidNamespace(namespace.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::scanner::{is_in_namespace, scan};
    use crate::catalog::{
        ComponentDescriptor, ConstructorArguments, ConstructorDefinition, MockTypeCatalog,
    };
    use crate::component::Injectable;
    use crate::error::ScanError;
    use crate::instance_provider::{ComponentInstanceBox, ErrorPtr};

    struct ServiceA;

    impl Injectable for ServiceA {}

    struct ServiceB;

    impl Injectable for ServiceB {}

    fn construct(_arguments: &mut ConstructorArguments) -> Result<ComponentInstanceBox, ErrorPtr> {
        Ok(Box::new(ServiceA))
    }

    fn create_catalog() -> MockTypeCatalog {
        let mut catalog = MockTypeCatalog::new();
        catalog.expect_descriptors().return_const(vec![
            ComponentDescriptor::new::<ServiceA>("ServiceA")
                .with_namespace("app::services")
                .with_constructor(ConstructorDefinition::new("new", vec![], construct)),
            ComponentDescriptor::new::<ServiceB>("ServiceB")
                .with_namespace("app::services::nested")
                .with_constructor(ConstructorDefinition::new("new", vec![], construct)),
        ]);
        catalog
    }

    #[test]
    fn should_find_components_in_namespace() {
        let catalog = create_catalog();

        let candidates = scan(&catalog, "app::services").unwrap();
        assert_eq!(candidates.len(), 2);

        let candidates = scan(&catalog, "app::services::nested").unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].type_name, "ServiceB");
    }

    #[test]
    fn should_report_missing_namespace() {
        let catalog = create_catalog();

        assert_eq!(
            scan(&catalog, "app::controllers").unwrap_err(),
            ScanError::NamespaceNotFound("app::controllers".to_string())
        );
    }

    #[test]
    fn should_reject_invalid_namespace() {
        let catalog = MockTypeCatalog::new();

        for namespace in ["", "app::", "app.services", "app services", "::app"] {
            assert_eq!(
                scan(&catalog, namespace).unwrap_err(),
                ScanError::InvalidNamespace(namespace.to_string())
            );
        }
    }

    #[test]
    fn should_match_whole_segments() {
        assert!(is_in_namespace("app::services", "app"));
        assert!(is_in_namespace("app", "app"));
        assert!(!is_in_namespace("application", "app"));
        assert!(!is_in_namespace("app", "app::services"));
    }
}
