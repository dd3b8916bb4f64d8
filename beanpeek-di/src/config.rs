//! Injection of externally sourced scalar configuration into component fields.
//!
//! Values come from a [ConfigSource] - an immutable, flat mapping from keys to strings, usually
//! loaded once from a property file:
//!
//! ```text
//! # comment
//! welcome.message = Hello there!
//! pool.size: 4
//! feature.enabled true
//! ```
//!
//! Supported field types are `String`, `i32`, `i64`, `bool`, `f32` and `f64`. Any other type
//! yields [ConfigInjectionError::UnsupportedConfigType]; a missing key yields
//! [ConfigInjectionError::ConfigValueMissing]. There are no silent defaults.

use crate::catalog::ComponentDescriptor;
use crate::error::{ConfigInjectionError, ConfigSourceError};
use fxhash::FxHashMap;
use std::any::{type_name, Any, TypeId};
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Name of the default property file.
pub const PROPERTIES_FILE: &str = "application.properties";

/// Kind of scalar a config value can be coerced into.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ConfigValueKind {
    String,
    Integer,
    Boolean,
    Float,
}

impl ConfigValueKind {
    /// Returns the kind for a given field type, if supported.
    pub fn of<T: Any>() -> Option<Self> {
        let type_id = TypeId::of::<T>();
        if type_id == TypeId::of::<String>() {
            Some(Self::String)
        } else if type_id == TypeId::of::<i32>() || type_id == TypeId::of::<i64>() {
            Some(Self::Integer)
        } else if type_id == TypeId::of::<bool>() {
            Some(Self::Boolean)
        } else if type_id == TypeId::of::<f32>() || type_id == TypeId::of::<f64>() {
            Some(Self::Float)
        } else {
            None
        }
    }
}

/// Flat key/value configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigSource {
    values: FxHashMap<String, String>,
}

impl ConfigSource {
    /// Loads a property file. A missing file is not an error - it results in an empty source.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigSourceError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let source = Self::from_properties(&content);
                info!("Loaded {} config values", source.len());
                Ok(source)
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {
                warn!("No {} found.", path.display());
                Ok(Self::default())
            }
            Err(error) => Err(ConfigSourceError::Io {
                path: path.display().to_string(),
                reason: error.to_string(),
            }),
        }
    }

    /// Parses property file syntax.
    pub fn from_properties(content: &str) -> Self {
        let mut values = FxHashMap::default();
        let mut lines = content.lines();

        while let Some(line) = lines.next() {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let mut logical_line = line.to_string();
            while ends_with_continuation(&logical_line) {
                logical_line.pop();
                match lines.next() {
                    Some(next) => logical_line.push_str(next.trim_start()),
                    None => break,
                }
            }

            let (key, value) = split_property(&logical_line);
            values.insert(key, value);
        }

        Self { values }
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_property(line: &str) -> (String, String) {
    let mut key = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    key.push(unescape(escaped));
                }
            }
            '=' | ':' => break,
            c if c.is_whitespace() => {
                while chars.peek().map(|c| c.is_whitespace()).unwrap_or(false) {
                    chars.next();
                }
                if matches!(chars.peek(), Some('=') | Some(':')) {
                    chars.next();
                }
                break;
            }
            c => key.push(c),
        }
    }

    while chars.peek().map(|c| c.is_whitespace()).unwrap_or(false) {
        chars.next();
    }

    let mut value = String::new();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                value.push(unescape(escaped));
            }
        } else {
            value.push(c);
        }
    }

    (key, value)
}

fn unescape(c: char) -> char {
    match c {
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        'f' => '\u{c}',
        other => other,
    }
}

/// Coerces a raw config value into the field type `T`.
pub fn coerce_property<T: Any>(
    key: &'static str,
    value: Option<&str>,
) -> Result<T, ConfigInjectionError> {
    let unsupported = || ConfigInjectionError::UnsupportedConfigType {
        key,
        type_name: type_name::<T>(),
    };

    let kind = ConfigValueKind::of::<T>().ok_or_else(unsupported)?;
    let value = value.ok_or(ConfigInjectionError::ConfigValueMissing(key))?;

    let converted: Box<dyn Any> = match kind {
        ConfigValueKind::String => Box::new(value.to_string()),
        ConfigValueKind::Integer if TypeId::of::<T>() == TypeId::of::<i32>() => {
            Box::new(parse::<i32>(key, value)?)
        }
        ConfigValueKind::Integer => Box::new(parse::<i64>(key, value)?),
        ConfigValueKind::Boolean => Box::new(parse_bool(key, value)?),
        ConfigValueKind::Float if TypeId::of::<T>() == TypeId::of::<f32>() => {
            Box::new(parse::<f32>(key, value)?)
        }
        ConfigValueKind::Float => Box::new(parse::<f64>(key, value)?),
    };

    converted
        .downcast::<T>()
        .map(|converted| *converted)
        .map_err(|_| unsupported())
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigInjectionError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigInjectionError::InvalidConfigValue {
            key,
            value: value.to_string(),
            type_name: type_name::<T>(),
        })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigInjectionError> {
    match value.trim() {
        value if value.eq_ignore_ascii_case("true") => Ok(true),
        value if value.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(ConfigInjectionError::InvalidConfigValue {
            key,
            value: value.to_string(),
            type_name: type_name::<bool>(),
        }),
    }
}

/// Resolves every config property of the component. Stops at the first failure.
pub fn inject(
    descriptor: &ComponentDescriptor,
    instance: &mut (dyn Any + Send + Sync),
    source: &ConfigSource,
) -> Result<(), ConfigInjectionError> {
    for property in &descriptor.config_properties {
        info!(
            "Setting config property: {}.{}",
            descriptor.type_name, property.field
        );

        (property.inject)(instance, source.get(property.key))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::catalog::{ComponentDescriptor, ConfigPropertyDefinition};
    use crate::component::Injectable;
    use crate::config::{coerce_property, inject, ConfigSource, ConfigValueKind};
    use crate::error::ConfigInjectionError;
    use std::any::Any;
    use std::io::Write;
    use std::time::Duration;

    #[derive(Default)]
    struct TestComponent {
        message: String,
        port: i32,
    }

    impl Injectable for TestComponent {}

    fn inject_message(
        instance: &mut (dyn Any + Send + Sync),
        value: Option<&str>,
    ) -> Result<(), ConfigInjectionError> {
        let component = instance
            .downcast_mut::<TestComponent>()
            .ok_or(ConfigInjectionError::IncompatibleComponent("TestComponent"))?;
        component.message = coerce_property("test.message", value)?;
        Ok(())
    }

    fn inject_port(
        instance: &mut (dyn Any + Send + Sync),
        value: Option<&str>,
    ) -> Result<(), ConfigInjectionError> {
        let component = instance
            .downcast_mut::<TestComponent>()
            .ok_or(ConfigInjectionError::IncompatibleComponent("TestComponent"))?;
        component.port = coerce_property("test.port", value)?;
        Ok(())
    }

    fn create_descriptor() -> ComponentDescriptor {
        ComponentDescriptor::new::<TestComponent>("TestComponent")
            .with_config_property(ConfigPropertyDefinition::new(
                "message",
                "test.message",
                inject_message,
            ))
            .with_config_property(ConfigPropertyDefinition::new(
                "port",
                "test.port",
                inject_port,
            ))
    }

    #[test]
    fn should_parse_properties() {
        let source = ConfigSource::from_properties(
            "# comment\n\
             ! another comment\n\
             \n\
             welcome.message = Hello there!\n\
             pool.size:4\n\
             feature.enabled true\n\
             multi.line = first \\\n    second\n\
             escaped\\=key = tab\\there\n\
             empty.value =\n",
        );

        assert_eq!(source.get("welcome.message"), Some("Hello there!"));
        assert_eq!(source.get("pool.size"), Some("4"));
        assert_eq!(source.get("feature.enabled"), Some("true"));
        assert_eq!(source.get("multi.line"), Some("first second"));
        assert_eq!(source.get("escaped=key"), Some("tab\there"));
        assert_eq!(source.get("empty.value"), Some(""));
        assert_eq!(source.len(), 6);
    }

    #[test]
    fn should_load_property_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "welcome.message=Welcome!").unwrap();

        let source = ConfigSource::load(file.path()).unwrap();
        assert_eq!(source.get("welcome.message"), Some("Welcome!"));
    }

    #[test]
    fn should_treat_missing_file_as_empty() {
        let directory = tempfile::tempdir().unwrap();

        let source = ConfigSource::load(directory.path().join("missing.properties")).unwrap();
        assert!(source.is_empty());
    }

    #[test]
    fn should_report_unreadable_file() {
        let directory = tempfile::tempdir().unwrap();
        assert!(ConfigSource::load(directory.path()).is_err());
    }

    #[test]
    fn should_coerce_supported_types() {
        assert_eq!(coerce_property::<i32>("key", Some("42")).unwrap(), 42);
        assert_eq!(
            coerce_property::<i64>("key", Some("-9000000000")).unwrap(),
            -9_000_000_000
        );
        assert!(coerce_property::<bool>("key", Some("true")).unwrap());
        assert!(!coerce_property::<bool>("key", Some("FALSE")).unwrap());
        assert_eq!(coerce_property::<f64>("key", Some("2.5")).unwrap(), 2.5);
        assert_eq!(coerce_property::<f32>("key", Some("0.5")).unwrap(), 0.5);
        assert_eq!(
            coerce_property::<String>("key", Some("text")).unwrap(),
            "text"
        );
    }

    #[test]
    fn should_reject_unsupported_type() {
        assert_eq!(
            coerce_property::<Duration>("key", Some("1")).unwrap_err(),
            ConfigInjectionError::UnsupportedConfigType {
                key: "key",
                type_name: std::any::type_name::<Duration>(),
            }
        );
        assert_eq!(ConfigValueKind::of::<u8>(), None);
    }

    #[test]
    fn should_reject_missing_value() {
        assert_eq!(
            coerce_property::<String>("key", None).unwrap_err(),
            ConfigInjectionError::ConfigValueMissing("key")
        );
    }

    #[test]
    fn should_reject_invalid_value() {
        assert!(matches!(
            coerce_property::<i32>("key", Some("forty-two")).unwrap_err(),
            ConfigInjectionError::InvalidConfigValue { .. }
        ));
        assert!(matches!(
            coerce_property::<bool>("key", Some("yes")).unwrap_err(),
            ConfigInjectionError::InvalidConfigValue { .. }
        ));
    }

    #[test]
    fn should_inject_fields() {
        let source: ConfigSource = [("test.message", "hello"), ("test.port", "8080")]
            .into_iter()
            .collect();

        let mut instance: Box<dyn Any + Send + Sync> = Box::<TestComponent>::default();
        inject(&create_descriptor(), instance.as_mut(), &source).unwrap();

        let component = instance.downcast_ref::<TestComponent>().unwrap();
        assert_eq!(component.message, "hello");
        assert_eq!(component.port, 8080);
    }

    #[test]
    fn should_fail_injection_on_missing_key() {
        let source: ConfigSource = [("test.message", "hello")].into_iter().collect();

        let mut instance: Box<dyn Any + Send + Sync> = Box::<TestComponent>::default();
        assert_eq!(
            inject(&create_descriptor(), instance.as_mut(), &source).unwrap_err(),
            ConfigInjectionError::ConfigValueMissing("test.port")
        );
    }
}
