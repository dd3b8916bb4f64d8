use crate::capability::{expand_component_alias, expand_injectable};
use crate::component::expand_component;
use crate::component_impl::expand_component_impl;
use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, Error, Item};

mod attributes;
mod capability;
mod component;
mod component_impl;

#[proc_macro_derive(Component, attributes(component))]
pub fn generate_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_component(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Declares constructors and lifecycle hooks of a component. Recognizes `#[constructor]`,
/// `#[post_construct]`, `#[pre_destroy]` and `#[log_execution_time]` on methods.
#[proc_macro_attribute]
pub fn component_impl(_attr: TokenStream, input: TokenStream) -> TokenStream {
    let mut input = parse_macro_input!(input as Item);
    expand_component_impl(&mut input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Registers a capability implementation for a component. Methods tagged with
/// `#[log_execution_time]` get timed when called through the capability.
#[proc_macro_attribute]
pub fn component_alias(_attr: TokenStream, input: TokenStream) -> TokenStream {
    let mut input = parse_macro_input!(input as Item);
    expand_component_alias(&mut input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Marks a trait as a capability, which can be used for component lookup and injection.
#[proc_macro_attribute]
pub fn injectable(_attr: TokenStream, input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as Item);
    expand_injectable(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}
