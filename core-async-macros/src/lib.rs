//! Attribute macros for async entry points and tests.
//!
//! `#[core_async::test]` and `#[core_async::main]` turn an `async fn` into a
//! plain function that drives the body on a current-thread runtime through
//! `core_async::runtime`, so crates never name Tokio in their test attributes.
//!
//! `#[core_async::test(start_paused)]` runs the body with the clock paused;
//! the consuming crate must enable `core-async/test-util`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Ident, ItemFn};

#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, MacroKind::Test)
}

#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, MacroKind::Main)
}

enum MacroKind {
    Test,
    Main,
}

enum Clock {
    Running,
    Paused,
}

fn parse_clock(attr: TokenStream, kind: &MacroKind) -> Result<Clock, syn::Error> {
    if attr.is_empty() {
        return Ok(Clock::Running);
    }

    let tokens = TokenStream2::from(attr);
    let ident: Ident = syn::parse2(tokens.clone())
        .map_err(|_| syn::Error::new_spanned(&tokens, "expected `start_paused`"))?;

    match (ident.to_string().as_str(), kind) {
        ("start_paused", MacroKind::Test) => Ok(Clock::Paused),
        ("start_paused", MacroKind::Main) => Err(syn::Error::new_spanned(
            ident,
            "`start_paused` is only supported on #[core_async::test]",
        )),
        _ => Err(syn::Error::new_spanned(
            ident,
            "unknown argument; the only supported argument is `start_paused`",
        )),
    }
}

fn expand(attr: TokenStream, item: TokenStream, kind: MacroKind) -> TokenStream {
    let clock = match parse_clock(attr, &kind) {
        Ok(clock) => clock,
        Err(err) => return err.to_compile_error().into(),
    };

    let input = parse_macro_input!(item as ItemFn);

    if input.sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            input.sig.fn_token,
            "core_async attribute macros require `async fn`",
        )
        .to_compile_error()
        .into();
    }

    let mut sig = input.sig;
    sig.asyncness = None;

    let attrs = input.attrs;
    let vis = input.vis;
    let block = input.block;

    let driver = match clock {
        Clock::Running => quote!(core_async::runtime::block_on),
        Clock::Paused => quote!(core_async::runtime::block_on_paused),
    };

    let test_attr = match kind {
        MacroKind::Test => quote!(#[test]),
        MacroKind::Main => quote!(),
    };

    quote! {
        #(#attrs)*
        #test_attr
        #vis #sig {
            #driver(async move #block)
        }
    }
    .into()
}
