use itertools::Itertools;
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use std::ops::Deref;
use syn::spanned::Spanned;
use syn::{
    Attribute, Error, FnArg, ImplItem, ImplItemFn, Item, ItemImpl, Result, ReturnType, Signature,
    Type,
};

pub const CONSTRUCTOR: &str = "constructor";
pub const POST_CONSTRUCT: &str = "post_construct";
pub const PRE_DESTROY: &str = "pre_destroy";
pub const LOG_EXECUTION_TIME: &str = "log_execution_time";

/// Removes marker attributes from a method and returns their names, in declaration order.
pub fn take_markers(attrs: &mut Vec<Attribute>, allowed: &[&'static str]) -> Vec<&'static str> {
    let mut markers = vec![];
    attrs.retain(|attr| {
        match allowed.iter().find(|name| attr.path().is_ident(name)) {
            Some(name) => {
                markers.push(*name);
                false
            }
            None => true,
        }
    });

    markers
}

fn marker_tag(marker: &str) -> TokenStream {
    match marker {
        CONSTRUCTOR => quote!(beanpeek_di::component::CONSTRUCTOR_TAG),
        POST_CONSTRUCT => quote!(beanpeek_di::component::POST_CONSTRUCT_TAG),
        PRE_DESTROY => quote!(beanpeek_di::component::PRE_DESTROY_TAG),
        _ => quote!(beanpeek_di::component::LOG_EXECUTION_TIME_TAG),
    }
}

pub fn method_definition(name: &Ident, markers: &[&str]) -> TokenStream {
    let name = name.to_string();
    let tags = markers.iter().map(|marker| marker_tag(marker));
    quote!(beanpeek_di::catalog::MethodDefinition::new(#name, vec![#(#tags),*]))
}

fn is_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => match ty.deref() {
            Type::Path(path) => path
                .path
                .segments
                .last()
                .map(|segment| segment.ident == "Result")
                .unwrap_or(false),
            _ => false,
        },
    }
}

fn make_constructor(self_ty: &Type, signature: &Signature) -> Result<TokenStream> {
    if let Some(receiver) = signature.receiver() {
        return Err(Error::new(
            receiver.span(),
            "Constructors cannot take self!",
        ));
    }

    let name = &signature.ident;
    let name_str = name.to_string();
    let construct = format_ident!("construct_{}", name);

    let types: Vec<_> = signature
        .inputs
        .iter()
        .filter_map(|input| match input {
            FnArg::Typed(typed) => {
                let ty = &typed.ty;
                Some(quote!(<#ty as std::ops::Deref>::Target))
            }
            FnArg::Receiver(_) => None,
        })
        .collect();

    let conversion = if is_result(&signature.output) {
        quote!(.map_err(beanpeek_di::instance_provider::into_error_ptr)?)
    } else {
        quote!()
    };

    Ok(quote! {
        fn #construct(
            #[allow(unused_variables)] arguments: &mut beanpeek_di::catalog::ConstructorArguments,
        ) -> Result<beanpeek_di::instance_provider::ComponentInstanceBox, beanpeek_di::instance_provider::ErrorPtr> {
            let instance: #self_ty = <#self_ty>::#name(#(arguments.next::<#types>()?),*)#conversion;
            Ok(Box::new(instance))
        }

        definition.constructors.push(beanpeek_di::catalog::ConstructorDefinition::new(
            #name_str,
            vec![#(beanpeek_di::catalog::Dependency::of::<#types>()),*],
            #construct,
        ));
    })
}

fn make_hook(self_ty: &Type, signature: &Signature, phase: &str) -> Result<TokenStream> {
    if signature.receiver().is_none() || signature.inputs.len() != 1 {
        return Err(Error::new(
            signature.span(),
            "Lifecycle hooks must take only &self!",
        ));
    }

    let name = &signature.ident;
    let name_str = name.to_string();
    let hook = format_ident!("{}_{}", phase, name);
    let collection = format_ident!("{}", phase);

    let call = if is_result(&signature.output) {
        quote!(component.#name().map_err(beanpeek_di::instance_provider::into_error_ptr))
    } else {
        quote! {
            component.#name();
            Ok(())
        }
    };

    Ok(quote! {
        fn #hook(
            instance: &(dyn std::any::Any + Send + Sync),
        ) -> Result<(), beanpeek_di::instance_provider::ErrorPtr> {
            let component = beanpeek_di::catalog::downcast_component::<#self_ty>(instance)?;
            #call
        }

        definition.#collection.push(beanpeek_di::catalog::LifecycleHook::new(#name_str, #hook));
    })
}

fn process_method(self_ty: &Type, method: &mut ImplItemFn) -> Result<TokenStream> {
    let markers = take_markers(
        &mut method.attrs,
        &[CONSTRUCTOR, POST_CONSTRUCT, PRE_DESTROY, LOG_EXECUTION_TIME],
    );

    let signature = &method.sig;
    let generated: Vec<_> = markers
        .iter()
        .filter_map(|marker| match *marker {
            CONSTRUCTOR => Some(make_constructor(self_ty, signature)),
            POST_CONSTRUCT | PRE_DESTROY => Some(make_hook(self_ty, signature, marker)),
            _ => None,
        })
        .try_collect()?;

    let definition = method_definition(&signature.ident, &markers);
    Ok(quote! {
        #(#generated)*
        definition.methods.push(#definition);
    })
}

pub fn expand_component_impl(item: &mut Item) -> Result<TokenStream> {
    let span = item.span();
    let Item::Impl(ItemImpl {
        trait_: None,
        self_ty,
        items,
        generics,
        ..
    }) = item
    else {
        return Err(Error::new(
            span,
            "component_impl can only be placed on inherent impl blocks!",
        ));
    };

    if !generics.params.is_empty() {
        return Err(Error::new(
            generics.span(),
            "Generic components are not supported!",
        ));
    }

    let self_ty = self_ty.deref().clone();
    let methods: Vec<_> = items
        .iter_mut()
        .filter_map(|item| match item {
            ImplItem::Fn(method) => Some(process_method(&self_ty, method)),
            _ => None,
        })
        .try_collect()?;

    let target_name = quote!(#self_ty).to_string();

    Ok(quote! {
        #item

        const _: () = {
            fn register() -> beanpeek_di::catalog::internal::ComponentImplDefinition {
                let mut definition = beanpeek_di::catalog::internal::ComponentImplDefinition {
                    target: std::any::TypeId::of::<#self_ty>(),
                    target_name: #target_name,
                    constructors: vec![],
                    methods: vec![],
                    post_construct: vec![],
                    pre_destroy: vec![],
                };

                #(#methods)*

                definition
            }

            beanpeek_di::catalog::internal::submit! {
                beanpeek_di::catalog::internal::ComponentImplRegisterer {
                    register
                }
            };
        };
    })
}
