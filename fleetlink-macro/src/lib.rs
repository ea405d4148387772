// Copyright 2025 The NativeLink Authors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{ItemFn, parse_macro_input};

/// `#[tokio::test]` for fleetlink crates. Installs the tracing subscriber
/// once per test binary and runs the body inside a span named after the
/// test, so interleaved log lines can be told apart. Arguments are passed
/// through to `tokio::test`, e.g. `#[fleetlink_test(start_paused = true)]`.
#[proc_macro_attribute]
pub fn fleetlink_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let tokio_args = proc_macro2::TokenStream::from(attr);
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = parse_macro_input!(item as ItemFn);

    if sig.asyncness.is_none() {
        return syn::Error::new(sig.fn_token.span(), "fleetlink_test requires an async fn")
            .to_compile_error()
            .into();
    }
    let test_name = &sig.ident;

    quote! {
        #(#attrs)*
        #[tokio::test(#tokio_args)]
        #vis #sig {
            // Already initialized by an earlier test.
            let _ = ::fleetlink_util::init_tracing();
            let span = ::fleetlink_util::__tracing::info_span!("test", name = stringify!(#test_name));
            ::fleetlink_util::__tracing::Instrument::instrument(async move #block, span).await
        }
    }
    .into()
}
