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

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, ItemFn, LitInt};

#[proc_macro_attribute]
pub fn rivet_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut timeout_ms: Option<u64> = None;
    let options = syn::meta::parser(|meta| {
        if meta.path.is_ident("timeout_ms") {
            let value: LitInt = meta.value()?.parse()?;
            timeout_ms = Some(value.base10_parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported rivet_test option"))
        }
    });
    parse_macro_input!(attr with options);

    let input = parse_macro_input!(item as ItemFn);
    let vis = &input.vis;
    let sig = &input.sig;
    let body = &input.block;
    let attrs = &input.attrs;
    let name = &sig.ident;
    let inputs = &sig.inputs;
    let output = &sig.output;

    let async_name = syn::Ident::new(&format!("__{name}_async"), name.span());

    let run = match timeout_ms {
        Some(ms) => quote! {
            match __private::tokio::time::timeout(
                ::std::time::Duration::from_millis(#ms),
                #async_name(),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => panic!("test {} timed out after {} ms", stringify!(#name), #ms),
            }
        },
        None => quote! { #async_name().await },
    };

    let output = quote! {
        #[test]
        #(#attrs)*
        #vis fn #name() #output {
            use ::std::sync::atomic::{AtomicBool, Ordering};
            use ::std::sync::Arc;
            use ::std::panic;
            use ::rivet_test::__private;

            #[derive(Clone, Default)]
            struct PanicInfo {
                occurred: Arc<AtomicBool>,
                message: Arc<__private::parking_lot::Mutex<Option<String>>>,
                location: Arc<__private::parking_lot::Mutex<Option<String>>>,
            }

            let panic_info = Arc::new(PanicInfo::default());
            let panic_info_clone = Arc::clone(&panic_info);

            let orig_hook = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                panic_info_clone.occurred.store(true, Ordering::SeqCst);
                let message = info
                    .payload()
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| info.payload().downcast_ref::<String>().cloned());
                *panic_info_clone.message.lock() = message.clone();
                *panic_info_clone.location.lock() = info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
                let cleaned_message = message
                    .unwrap_or_else(|| "No error message".to_string())
                    .trim()
                    .replace('\n', " ");
                __private::tracing::error!("Panic: {}", cleaned_message);
                orig_hook(info);
            }));

            let runtime = __private::tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("failed to build the test runtime");

            let result = runtime.block_on(async {
                let test_span = __private::tracing::info_span!("rivet_test", name = stringify!(#name));
                let _enter = test_span.enter();
                #run
            });

            if panic_info.occurred.load(Ordering::SeqCst) {
                let message = panic_info.message.lock().clone();
                let location = panic_info.location.lock().clone();
                let location_str = location.unwrap_or_else(|| "unknown location".to_string());
                let cleaned_message = message
                    .unwrap_or_else(|| "No error message".to_string())
                    .trim()
                    .replace('\n', " ");
                panic!("Panic at {}: {}", location_str, cleaned_message);
            }

            result
        }

        async fn #async_name(#inputs) #output #body
    };

    output.into()
}
