//! Contract declarations.
//!
//! [`service_contract!`](crate::service_contract) turns a list of method
//! signatures into:
//!
//! - an async trait (the contract real services implement),
//! - a proxy struct implementing that trait by routing each call through a
//!   [`ProxyBinding`](super::ProxyBinding),
//! - a [`ServiceContract`](super::ServiceContract) impl for the trait object,
//!   including dispatch from an [`Invocation`](invoker_core::Invocation) back
//!   into a real implementation.
//!
//! ```ignore
//! invoker_server::service_contract! {
//!     /// Greets people.
//!     pub trait Greeter as GreeterProxy {
//!         fn greet(name: String) -> String;
//!         fn count() -> u64;
//!     }
//! }
//! ```
//!
//! Prefixing `trait` with `sealed` declares a contract that refuses proxying.
//! Every method must spell out its return type, `-> ()` included. Arguments
//! and results cross the chain as JSON values, so they must implement
//! `Serialize` and `DeserializeOwned`.

/// Declares a service contract, its proxy type and its dispatch table.
#[macro_export]
macro_rules! service_contract {
    (@emit $kind:ident;
        $(#[$meta:meta])*
        $vis:vis trait $name:ident as $proxy:ident {
            $(
                $(#[$mmeta:meta])*
                fn $method:ident ( $( $arg:ident : $argty:ty ),* $(,)? ) -> $ret:ty;
            )*
        }
    ) => {
        $(#[$meta])*
        #[$crate::__private::async_trait]
        $vis trait $name: ::core::marker::Send + ::core::marker::Sync {
            $(
                $(#[$mmeta])*
                async fn $method(&self $(, $arg: $argty)*)
                    -> ::core::result::Result<$ret, $crate::proxy::InvocationError>;
            )*
        }

        #[doc = ::core::concat!("Proxy of [`", ::core::stringify!($name), "`] routing every call through a handler chain.")]
        $vis struct $proxy {
            binding: $crate::proxy::ProxyBinding,
        }

        impl $proxy {
            /// The binding this proxy routes calls through.
            #[allow(dead_code)]
            pub fn binding(&self) -> &$crate::proxy::ProxyBinding {
                &self.binding
            }
        }

        #[$crate::__private::async_trait]
        impl $name for $proxy {
            $(
                async fn $method(&self $(, $arg: $argty)*)
                    -> ::core::result::Result<$ret, $crate::proxy::InvocationError>
                {
                    const SIGNATURE: $crate::__private::MethodSignature = $crate::__private::MethodSignature {
                        contract: ::core::stringify!($name),
                        name: ::core::stringify!($method),
                        params: &[$(::core::stringify!($argty)),*],
                        returns: ::core::stringify!($ret),
                    };
                    let args: ::std::vec::Vec<$crate::__private::Value> = ::std::vec![
                        $($crate::proxy::encode_value(&$arg, ::core::stringify!($arg))?),*
                    ];
                    let value = self.binding.invoke(SIGNATURE, args).await?;
                    $crate::proxy::decode_value(
                        value,
                        ::core::concat!("result of ", ::core::stringify!($method)),
                    )
                }
            )*
        }

        impl $crate::proxy::ServiceContract for dyn $name {
            const DESCRIPTOR: $crate::proxy::ContractDescriptor = $crate::proxy::ContractDescriptor {
                name: ::core::stringify!($name),
                kind: $crate::proxy::ContractKind::$kind,
                methods: &[
                    $(
                        $crate::__private::MethodSignature {
                            contract: ::core::stringify!($name),
                            name: ::core::stringify!($method),
                            params: &[$(::core::stringify!($argty)),*],
                            returns: ::core::stringify!($ret),
                        },
                    )*
                ],
            };

            fn bind(binding: $crate::proxy::ProxyBinding) -> ::std::sync::Arc<Self> {
                ::std::sync::Arc::new($proxy { binding })
            }

            fn dispatch<'a>(
                target: &'a Self,
                invocation: $crate::__private::Invocation,
            ) -> $crate::__private::BoxFuture<
                'a,
                ::core::result::Result<$crate::__private::Value, $crate::proxy::InvocationError>,
            > {
                ::std::boxed::Box::pin(async move {
                    let method = invocation.method;
                    #[allow(unused_mut, unused_variables)]
                    let mut args = invocation.args.into_iter();
                    match method.name {
                        $(
                            ::core::stringify!($method) => {
                                $(
                                    let $arg: $argty = $crate::proxy::take_argument(
                                        &mut args,
                                        method,
                                        ::core::stringify!($arg),
                                    )?;
                                )*
                                let result = target.$method($($arg),*).await?;
                                $crate::proxy::encode_value(
                                    &result,
                                    ::core::concat!("result of ", ::core::stringify!($method)),
                                )
                            }
                        )*
                        other => ::core::result::Result::Err(
                            $crate::proxy::InvocationError::UnknownMethod {
                                contract: ::core::stringify!($name).to_string(),
                                method: other.to_string(),
                            },
                        ),
                    }
                })
            }
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis sealed trait $name:ident as $proxy:ident { $($body:tt)* }
    ) => {
        $crate::service_contract! {
            @emit Sealed;
            $(#[$meta])*
            $vis trait $name as $proxy { $($body)* }
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis trait $name:ident as $proxy:ident { $($body:tt)* }
    ) => {
        $crate::service_contract! {
            @emit Interface;
            $(#[$meta])*
            $vis trait $name as $proxy { $($body)* }
        }
    };
}
