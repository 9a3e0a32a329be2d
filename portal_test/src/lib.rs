use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous engine test into a synchronous one, inject dependencies,
/// and report the recorded vote requests if the test panics.
///
/// Injectable dependencies are `crate::service::FakeElectionService` and
/// `crate::engine::VotingEngine<FakeElectionService>`; both share the same fake,
/// so requests made through the engine are visible on the injected service.
///
/// `#[portal_test(voter)]` binds `VoterIdentity::example()` to the engine before the
/// test body runs.
#[proc_macro_attribute]
pub fn portal_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the injected arguments and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Bind the example voter if asked to.
    let maybe_bind = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) if arg == "voter" => quote! {
            engine.bind_voter(crate::model::VoterIdentity::example(), None);
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `voter` or no argument")
                .into_compile_error()
                .into();
        }
        None => quote! {},
    };

    quote! {
        #[test]
        fn #name() {
            /// The test itself.
            #item_fn

            log4rs_test_utils::test_logging::init_logging_once_for(["voting_portal"], None, None);

            // The engine is single-threaded and cooperative, so one thread is enough.
            let runtime = rocket::tokio::runtime::Builder::new_current_thread()
                .thread_name("portal-test")
                .enable_all()
                .build()
                .unwrap();

            // Test setup.
            let service = crate::service::FakeElectionService::new();
            #[allow(unused_mut, unused_variables)]
            let mut engine = crate::engine::VotingEngine::new(service.clone());
            #maybe_bind

            // Run the test, catching any panics so the request log can be reported.
            let recorded = service.clone();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                runtime.block_on(#new_name(#(#test_args),*));
            }));

            // If the test panicked, report what was sent and re-raise the panic.
            if let Err(cause) = result {
                log::error!("Vote requests recorded before failure: {:?}", recorded.votes());
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_engine = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    // Valid as the last path segment for any type is itself.
                    if let Some(segment) = type_path.path.segments.last() {
                        if segment.ident == "FakeElectionService" {
                            args.push(quote! { service.clone() });
                            continue;
                        } else if segment.ident == "VotingEngine" {
                            if has_engine {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test cannot accept more than one `VotingEngine`",
                                ));
                            }
                            has_engine = true;
                            args.push(quote! { engine });
                            continue;
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `service: FakeElectionService` or `engine: VotingEngine<FakeElectionService>`",
        ));
    }

    Ok(args)
}
