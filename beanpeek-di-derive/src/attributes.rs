use syn::{Attribute, Error, ExprArray, ExprPath, LitStr, Token};

pub enum DefaultDefinition {
    Default,
    Expr(ExprPath),
}

pub struct FieldAttributes {
    pub default: Option<DefaultDefinition>,
    pub config: Option<LitStr>,
    pub ignore: bool,
}

impl TryFrom<&Attribute> for FieldAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        let mut default = None;
        let mut config = None;
        let mut ignore = false;
        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                if meta.input.peek(Token![=]) {
                    let value = meta.value()?;
                    let expr: LitStr = value.parse()?;
                    default = Some(DefaultDefinition::Expr(expr.parse()?));
                } else {
                    default = Some(DefaultDefinition::Default);
                }
            } else if meta.path.is_ident("config") {
                config = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("ignore") {
                ignore = true;
            } else {
                return Err(meta.error("unsupported field attribute"));
            }

            Ok(())
        })?;

        if config.is_some() && default.is_some() {
            return Err(Error::new_spanned(
                value,
                "Config fields cannot have a default value!",
            ));
        }

        Ok(Self {
            default,
            config,
            ignore,
        })
    }
}

pub struct ComponentAttributes {
    pub name: Option<LitStr>,
    pub tags: Option<ExprArray>,
}

impl TryFrom<&Attribute> for ComponentAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        let mut name = None;
        let mut tags = None;
        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value().and_then(|value| value.parse())?);
            } else if meta.path.is_ident("tags") {
                tags = Some(meta.value().and_then(|value| value.parse())?);
            } else {
                return Err(meta.error("unsupported component attribute"));
            }

            Ok(())
        })?;

        Ok(Self { name, tags })
    }
}
