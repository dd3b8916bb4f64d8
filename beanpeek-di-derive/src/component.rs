use crate::attributes::{ComponentAttributes, DefaultDefinition, FieldAttributes};
use convert_case::{Case, Casing};
use itertools::Itertools;
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{
    Attribute, Data, DataStruct, DeriveInput, Error, Expr, ExprArray, ExprLit, Field, Fields, Lit,
    Member, Result,
};

pub const COMPONENT: &str = "component";

enum FieldKind {
    Dependency,
    Default(TokenStream),
    Config(String),
    Ignored,
}

struct ComponentField<'a> {
    member: Member,
    field: &'a Field,
    kind: FieldKind,
}

fn classify_field(index: usize, field: &Field) -> Result<ComponentField> {
    let member = field
        .ident
        .clone()
        .map(Member::Named)
        .unwrap_or_else(|| Member::Unnamed(index.into()));

    let mut kind = FieldKind::Dependency;
    for attr in &field.attrs {
        if attr.path().is_ident(COMPONENT) {
            let attributes = FieldAttributes::try_from(attr)?;
            kind = if attributes.ignore {
                FieldKind::Ignored
            } else if let Some(key) = attributes.config {
                FieldKind::Config(key.value())
            } else {
                match attributes.default {
                    Some(DefaultDefinition::Expr(path)) => FieldKind::Default(quote!(#path())),
                    Some(DefaultDefinition::Default) => {
                        FieldKind::Default(quote!(std::default::Default::default()))
                    }
                    None => kind,
                }
            };
        }
    }

    Ok(ComponentField {
        member,
        field,
        kind,
    })
}

fn dependency_type(field: &Field) -> TokenStream {
    let ty = &field.ty;
    quote!(<#ty as std::ops::Deref>::Target)
}

fn make_constructor(ident: &Ident, shape: &Fields, fields: &[ComponentField]) -> TokenStream {
    let values = fields.iter().map(|field| match &field.kind {
        FieldKind::Dependency => {
            let ty = dependency_type(field.field);
            quote!(arguments.next::<#ty>()?)
        }
        FieldKind::Default(value) => value.clone(),
        FieldKind::Config(_) | FieldKind::Ignored => quote!(std::default::Default::default()),
    });

    let instance = match shape {
        Fields::Unit => quote!(#ident),
        Fields::Unnamed(_) => quote!(#ident(#(#values),*)),
        Fields::Named(_) => {
            let members = fields.iter().map(|field| &field.member);
            quote!(#ident { #(#members: #values),* })
        }
    };

    let dependencies = fields
        .iter()
        .filter(|field| matches!(field.kind, FieldKind::Dependency))
        .map(|field| {
            let ty = dependency_type(field.field);
            quote!(beanpeek_di::catalog::Dependency::of::<#ty>())
        });

    quote! {
        fn construct(
            #[allow(unused_variables)] arguments: &mut beanpeek_di::catalog::ConstructorArguments,
        ) -> Result<beanpeek_di::instance_provider::ComponentInstanceBox, beanpeek_di::instance_provider::ErrorPtr> {
            Ok(Box::new(#instance))
        }

        descriptor = descriptor.with_constructor(beanpeek_di::catalog::ConstructorDefinition::new(
            "new",
            vec![#(#dependencies),*],
            construct,
        ));
    }
}

fn make_config_properties(ident: &Ident, fields: &[ComponentField]) -> TokenStream {
    let type_name = ident.to_string();
    let properties = fields.iter().filter_map(|field| {
        let FieldKind::Config(key) = &field.kind else {
            return None;
        };

        let member = &field.member;
        let field_name = match member {
            Member::Named(ident) => ident.to_string(),
            Member::Unnamed(index) => index.index.to_string(),
        };
        let inject = format_ident!("inject_{}", field_name);

        Some(quote! {
            fn #inject(
                instance: &mut (dyn std::any::Any + Send + Sync),
                value: Option<&str>,
            ) -> Result<(), beanpeek_di::error::ConfigInjectionError> {
                let component = instance.downcast_mut::<#ident>().ok_or(
                    beanpeek_di::error::ConfigInjectionError::IncompatibleComponent(#type_name),
                )?;
                component.#member = beanpeek_di::config::coerce_property(#key, value)?;
                Ok(())
            }

            descriptor = descriptor.with_config_property(
                beanpeek_di::catalog::ConfigPropertyDefinition::new(#field_name, #key, #inject),
            );
        })
    });

    quote!(#(#properties)*)
}

fn extract_component_attributes(attributes: &[Attribute]) -> Result<Option<ComponentAttributes>> {
    attributes
        .iter()
        .filter_map(|attribute| {
            if attribute.path().is_ident(COMPONENT) {
                Some(ComponentAttributes::try_from(attribute))
            } else {
                None
            }
        })
        .next()
        .transpose()
}

fn generate_tags(tags: Option<&ExprArray>) -> Result<Vec<String>> {
    tags.map(|tags| {
        tags.elems
            .iter()
            .map(|elem| {
                if let Expr::Lit(ExprLit {
                    lit: Lit::Str(string),
                    ..
                }) = elem
                {
                    Ok(string.value())
                } else {
                    Err(Error::new(elem.span(), "Tags must be string literals!"))
                }
            })
            .try_collect::<_, Vec<_>, _>()
    })
    .transpose()
    .map(Option::unwrap_or_default)
}

pub fn expand_component(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(DataStruct { fields, .. }) = &input.data else {
        return Err(Error::new(
            input.span(),
            "Can only derive Component on structs!",
        ));
    };

    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "Generic components are not supported!",
        ));
    }

    let ident = &input.ident;
    let type_name = ident.to_string();

    let shape = fields;
    let fields: Vec<_> = shape
        .iter()
        .enumerate()
        .map(|(index, field)| classify_field(index, field))
        .try_collect()?;

    // ignored fields can only be initialized by explicit constructors
    let constructor = if fields
        .iter()
        .any(|field| matches!(field.kind, FieldKind::Ignored))
    {
        quote!()
    } else {
        make_constructor(ident, shape, &fields)
    };

    let config_properties = make_config_properties(ident, &fields);

    let attributes = extract_component_attributes(&input.attrs)?;
    let name = attributes
        .as_ref()
        .and_then(|attributes| attributes.name.as_ref())
        .map(|name| name.value())
        .unwrap_or_else(|| type_name.to_case(Case::Snake));
    let tags = generate_tags(
        attributes
            .as_ref()
            .and_then(|attributes| attributes.tags.as_ref()),
    )?;

    Ok(quote! {
        #[automatically_derived]
        impl beanpeek_di::component::Injectable for #ident {}

        #[automatically_derived]
        impl beanpeek_di::component::ComponentDowncast<#ident> for #ident {
            fn downcast(
                source: beanpeek_di::instance_provider::ComponentInstanceAnyPtr,
            ) -> Result<beanpeek_di::instance_provider::ComponentInstancePtr<Self>, beanpeek_di::instance_provider::ComponentInstanceAnyPtr> {
                source.downcast()
            }
        }

        #[automatically_derived]
        impl beanpeek_di::component::Component for #ident {
            fn descriptor() -> beanpeek_di::catalog::ComponentDescriptor {
                #[allow(unused_mut)]
                let mut descriptor = beanpeek_di::catalog::ComponentDescriptor::new::<#ident>(#type_name)
                    .with_name(#name)
                    .with_namespace(module_path!())
                    #(.with_tag(#tags))*;

                #constructor
                #config_properties

                descriptor
            }
        }

        const _: () = {
            fn register() -> beanpeek_di::catalog::ComponentDescriptor {
                <#ident as beanpeek_di::component::Component>::descriptor()
            }

            beanpeek_di::catalog::internal::submit! {
                beanpeek_di::catalog::internal::ComponentDefinitionRegisterer {
                    register
                }
            };
        };
    })
}
