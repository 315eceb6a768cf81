/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! Rivet Macro Library
//!
//! Procedural macros for the Rivet actor framework.
//!
//! # Message Macro
//!
//! [`rivet_message`] declares a message type and decides how handlers receive it:
//!
//! ```ignore
//! // Handlers get a copy-on-write `Param<Reading>`
//! #[rivet_message]
//! pub struct Reading {
//!     pub samples: Vec<f64>,
//! }
//!
//! // Serializable, so it can be registered for remote delivery
//! #[rivet_message(remote)]
//! pub struct Job {
//!     pub id: u64,
//! }
//!
//! // Fieldless, so handlers always get it by value
//! #[rivet_message]
//! pub struct Tick;
//!
//! // Small value handed to handlers by value
//! #[rivet_message(by_value)]
//! pub struct Celsius(pub f32);
//! ```
//!
//! # Actor Macro
//!
//! [`rivet_actor`] derives what an actor's state type needs:
//!
//! ```ignore
//! #[rivet_actor]
//! pub struct Counter {
//!     count: i32,
//! }
//! ```

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput};

fn has_derive(input: &DeriveInput, trait_name: &str) -> bool {
    input.attrs.iter().any(|attr| {
        if attr.path().is_ident("derive") {
            let mut found = false;
            let _ = attr.parse_nested_meta(|meta| {
                if meta
                    .path
                    .segments
                    .last()
                    .is_some_and(|segment| segment.ident == trait_name)
                {
                    found = true;
                }
                Ok(())
            });
            found
        } else {
            false
        }
    })
}

/// A struct with no fields carries nothing worth sharing.
fn is_fieldless(input: &DeriveInput) -> bool {
    matches!(&input.data, Data::Struct(data) if data.fields.is_empty())
}

/// Options accepted by `#[rivet_message(...)]`.
#[derive(Default)]
struct MessageConfig {
    /// Derive serde traits so the type can be registered for remote delivery.
    remote: bool,
    /// Hand the message to handlers by value instead of wrapped in `Param`.
    by_value: bool,
}

impl MessageConfig {
    fn parse(attr: &TokenStream) -> Self {
        let mut config = Self::default();
        for part in attr.to_string().split(',') {
            match part.trim() {
                "remote" => config.remote = true,
                "by_value" => config.by_value = true,
                _ => {}
            }
        }
        config
    }
}

#[derive(Default)]
struct ActorConfig {
    /// Skip deriving Default (user will implement it manually).
    no_default: bool,
}

impl ActorConfig {
    fn parse(attr: &TokenStream) -> Self {
        Self {
            no_default: attr
                .to_string()
                .split(',')
                .any(|part| part.trim() == "no_default"),
        }
    }
}

/// Declares a Rivet message type.
///
/// Expands to:
/// - `#[derive(Clone, Debug)]` for whichever of the two is not already derived
/// - an implementation of `HandlerArg` choosing how handlers receive the message
/// - a compile-time assertion that the type is `Send + Sync + 'static`
///
/// By default handlers get a `Param<Self>`, which shares the payload with the envelope
/// and copies only if the handler mutates a payload that other recipients still see.
/// Structs without fields skip the wrapper and are handed over by value.
///
/// # Options
///
/// - `remote`: also derives `serde::Serialize` and `serde::Deserialize`, so the type can
///   be added to the system's `TypeRegistry` and sent to published actors.
/// - `by_value`: handlers receive `Self`, cloned out of the envelope only when the payload
///   is shared. Meant for small messages.
#[proc_macro_attribute]
pub fn rivet_message(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = MessageConfig::parse(&attr);
    let input = parse_macro_input!(item as DeriveInput);

    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let derives = {
        let mut traits = Vec::new();
        if !has_derive(&input, "Clone") {
            traits.push(quote!(Clone));
        }
        if !has_derive(&input, "Debug") {
            traits.push(quote!(Debug));
        }
        if config.remote {
            if !has_derive(&input, "Serialize") {
                traits.push(quote!(::serde::Serialize));
            }
            if !has_derive(&input, "Deserialize") {
                traits.push(quote!(::serde::Deserialize));
            }
        }
        if traits.is_empty() {
            quote!()
        } else {
            quote!(#[derive(#(#traits),*)])
        }
    };

    let handler_arg = if config.by_value || is_fieldless(&input) {
        quote! {
            type Arg = Self;

            #[inline]
            fn into_arg(message: ::std::sync::Arc<Self>) -> Self::Arg {
                ::std::sync::Arc::unwrap_or_clone(message)
            }
        }
    } else {
        quote! {
            type Arg = ::rivet_core::prelude::Param<Self>;

            #[inline]
            fn into_arg(message: ::std::sync::Arc<Self>) -> Self::Arg {
                ::rivet_core::prelude::Param::from_arc(message)
            }
        }
    };

    let assert_ident = quote::format_ident!("_AssertRivetMessage_{}", name);

    let expanded = quote! {
        #derives
        #input

        impl #impl_generics ::rivet_core::prelude::HandlerArg for #name #ty_generics #where_clause {
            #handler_arg
        }

        #[doc(hidden)]
        #[allow(dead_code, non_camel_case_types, non_snake_case, clippy::needless_lifetimes)]
        const _: () = {
            fn #assert_ident #impl_generics () #where_clause {
                fn assert_bounds<T: Send + Sync + 'static>() {}
                assert_bounds::<#name #ty_generics>();
            }
        };
    };

    TokenStream::from(expanded)
}

/// Derives what a type needs to be a Rivet actor's state.
///
/// Expands to `#[derive(Default, Debug)]` (only traits not already present) and a
/// compile-time assertion that the type is `Send + 'static`.
///
/// Use `#[rivet_actor(no_default)]` to provide `Default` by hand.
#[proc_macro_attribute]
pub fn rivet_actor(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = ActorConfig::parse(&attr);
    let input = parse_macro_input!(item as DeriveInput);

    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let derives = {
        let mut traits = Vec::new();
        if !config.no_default && !has_derive(&input, "Default") {
            traits.push(quote!(Default));
        }
        if !has_derive(&input, "Debug") {
            traits.push(quote!(Debug));
        }
        if traits.is_empty() {
            quote!()
        } else {
            quote!(#[derive(#(#traits),*)])
        }
    };

    let assert_ident = quote::format_ident!("_AssertRivetActor_{}", name);

    let expanded = quote! {
        #derives
        #input

        #[doc(hidden)]
        #[allow(dead_code, non_camel_case_types, non_snake_case, clippy::needless_lifetimes)]
        const _: () = {
            fn #assert_ident #impl_generics () #where_clause {
                fn assert_bounds<T: Send + 'static>() {}
                assert_bounds::<#name #ty_generics>();
            }
        };
    };

    TokenStream::from(expanded)
}
