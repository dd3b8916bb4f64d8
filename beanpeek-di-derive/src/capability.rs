use crate::component_impl::{method_definition, take_markers, LOG_EXECUTION_TIME};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{Error, FnArg, ImplItem, Item, ItemImpl, ItemTrait, Pat, PatIdent, Result, TraitItem, Type};

fn forward_method(method: &syn::TraitItemFn) -> Result<Option<TokenStream>> {
    let signature = &method.sig;
    let Some(receiver) = signature.receiver() else {
        // not callable through a trait object
        return if method.default.is_some() {
            Ok(None)
        } else {
            Err(Error::new(
                signature.span(),
                "Capability methods must take &self!",
            ))
        };
    };

    // proxies reach their target through a shared reference only
    if receiver.reference.is_none() || receiver.mutability.is_some() {
        return Err(Error::new(
            receiver.span(),
            "Capability methods must take &self!",
        ));
    }

    if signature.asyncness.is_some() || signature.unsafety.is_some() {
        return Err(Error::new(
            signature.span(),
            "Async and unsafe capability methods are not supported!",
        ));
    }

    let mut signature = signature.clone();
    let mut arguments = vec![];
    for (index, input) in signature.inputs.iter_mut().enumerate() {
        if let FnArg::Typed(typed) = input {
            let ident = format_ident!("arg{}", index);
            typed.pat = Box::new(Pat::Ident(PatIdent {
                attrs: vec![],
                by_ref: None,
                mutability: None,
                ident: ident.clone(),
                subpat: None,
            }));
            arguments.push(ident);
        }
    }

    let name = &signature.ident;
    let name_str = name.to_string();
    Ok(Some(quote! {
        #signature {
            self.intercept(#name_str, |target| target.#name(#(#arguments),*))
        }
    }))
}

pub fn expand_injectable(item: &Item) -> Result<TokenStream> {
    let Item::Trait(ItemTrait {
        ident,
        generics,
        items,
        ..
    }) = item
    else {
        return Err(Error::new(
            item.span(),
            "injectable can only be placed on traits!",
        ));
    };

    if !generics.params.is_empty() {
        return Err(Error::new(
            generics.span(),
            "Generic capabilities are not supported!",
        ));
    }

    let mut methods = vec![];
    for item in items {
        if let TraitItem::Fn(method) = item {
            if let Some(method) = forward_method(method)? {
                methods.push(method);
            }
        }
    }

    Ok(quote! {
        #item

        #[automatically_derived]
        impl beanpeek_di::component::Injectable for dyn #ident + Send + Sync {}

        #[automatically_derived]
        impl #ident for beanpeek_di::proxy::TimingProxy<dyn #ident + Send + Sync> {
            #(#methods)*
        }
    })
}

pub fn expand_component_alias(item: &mut Item) -> Result<TokenStream> {
    let span = item.span();
    let Item::Impl(ItemImpl {
        trait_: Some((_, trait_path, _)),
        self_ty,
        items,
        ..
    }) = item
    else {
        return Err(Error::new(
            span,
            "Registering capabilities is possible only on trait implementations!",
        ));
    };

    let target_type = if let Type::Path(path) = self_ty.as_ref() {
        path.path.clone()
    } else {
        return Err(Error::new(
            self_ty.span(),
            "Registering capabilities is only available for Components!",
        ));
    };

    let trait_path = trait_path.clone();
    let mut methods = vec![];
    let mut timed_methods = vec![];
    for item in items.iter_mut() {
        if let ImplItem::Fn(method) = item {
            let markers = take_markers(&mut method.attrs, &[LOG_EXECUTION_TIME]);
            if !markers.is_empty() {
                timed_methods.push(method.sig.ident.to_string());
            }

            methods.push(method_definition(&method.sig.ident, &markers));
        }
    }

    let target_name = quote!(#target_type).to_string();

    Ok(quote! {
        #item

        #[automatically_derived]
        impl beanpeek_di::component::ComponentDowncast<#target_type> for dyn #trait_path + Send + Sync {
            fn downcast(
                source: beanpeek_di::instance_provider::ComponentInstanceAnyPtr,
            ) -> Result<beanpeek_di::instance_provider::ComponentInstancePtr<Self>, beanpeek_di::instance_provider::ComponentInstanceAnyPtr> {
                source
                    .downcast::<#target_type>()
                    .map(|p| p as beanpeek_di::instance_provider::ComponentInstancePtr<Self>)
            }
        }

        const _: () = {
            type Capability = dyn #trait_path + Send + Sync;

            fn cast(
                instance: beanpeek_di::instance_provider::ComponentInstanceAnyPtr,
            ) -> Result<beanpeek_di::instance_provider::CastInstancePtr, beanpeek_di::instance_provider::ComponentInstanceAnyPtr> {
                <Capability as beanpeek_di::component::ComponentDowncast<#target_type>>::downcast(instance)
                    .map(|p| std::sync::Arc::new(p) as beanpeek_di::instance_provider::CastInstancePtr)
            }

            fn wrap(
                instance: beanpeek_di::instance_provider::ComponentInstanceAnyPtr,
                context: beanpeek_di::proxy::InterceptionContext,
            ) -> Result<beanpeek_di::instance_provider::CastInstancePtr, beanpeek_di::instance_provider::ComponentInstanceAnyPtr> {
                <Capability as beanpeek_di::component::ComponentDowncast<#target_type>>::downcast(instance)
                    .map(|p| {
                        let proxy = beanpeek_di::instance_provider::ComponentInstancePtr::new(
                            beanpeek_di::proxy::TimingProxy::new(p, context),
                        ) as beanpeek_di::instance_provider::ComponentInstancePtr<Capability>;
                        std::sync::Arc::new(proxy) as beanpeek_di::instance_provider::CastInstancePtr
                    })
            }

            fn register() -> beanpeek_di::catalog::internal::ComponentAliasDefinition {
                beanpeek_di::catalog::internal::ComponentAliasDefinition {
                    target: std::any::TypeId::of::<#target_type>(),
                    target_name: #target_name,
                    capability: beanpeek_di::catalog::CapabilityDefinition {
                        type_id: std::any::TypeId::of::<Capability>(),
                        type_name: std::any::type_name::<Capability>(),
                        cast,
                        wrap,
                        timed_methods: vec![#(#timed_methods),*],
                    },
                    methods: vec![#(#methods),*],
                }
            }

            beanpeek_di::catalog::internal::submit! {
                beanpeek_di::catalog::internal::ComponentAliasRegisterer {
                    register
                }
            };
        };
    })
}
