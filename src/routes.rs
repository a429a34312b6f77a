//! Per-key invocation surface.
//!
//! A [`Route`] is a typed callable bound to one key: `route.send(request)`
//! behaves exactly like `mediator.send(key, request)`. The key is not checked
//! when the route is created, only when it is called, so a route to an
//! unregistered key reports `HandlerNotFound` at call time.
//!
//! [`mediator_routes!`](crate::mediator_routes) generates an extension trait
//! with one method per key, so call sites can read `mediator.create_user(req)`:
//!
//! ```ignore
//! rust_mediator::mediator_routes! {
//!     pub trait UserRoutes {
//!         fn create_user("createUser"): CreateUser => User;
//!         fn delete_user("deleteUser"): DeleteUser => ();
//!     }
//! }
//!
//! let user = mediator.create_user(CreateUser { name: "Ann".into() }).await?;
//! ```

use crate::core::error_mediator::MediatorError;
use crate::core::mediator::Mediator;
use std::marker::PhantomData;

pub struct Route<'a, Req, Res> {
    mediator: &'a Mediator,
    key: String,
    _phantom: PhantomData<fn(Req) -> Res>,
}

impl<'a, Req, Res> Route<'a, Req, Res>
where
    Req: Send + Sync + 'static,
    Res: Send + Sync + 'static,
{
    pub(crate) fn new(mediator: &'a Mediator, key: String) -> Self {
        Self {
            mediator,
            key,
            _phantom: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn send(&self, request: Req) -> Result<Res, MediatorError> {
        self.mediator.send(&self.key, request).await
    }
}

impl<Req, Res> Clone for Route<'_, Req, Res> {
    fn clone(&self) -> Self {
        Self {
            mediator: self.mediator,
            key: self.key.clone(),
            _phantom: PhantomData,
        }
    }
}

#[macro_export]
macro_rules! mediator_routes {
    (
        $(#[$meta:meta])*
        $vis:vis trait $name:ident {
            $(
                $(#[$fn_meta:meta])*
                fn $method:ident($key:literal): $req:ty => $res:ty;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis trait $name {
            $(
                $(#[$fn_meta])*
                fn $method(
                    &self,
                    request: $req,
                ) -> $crate::__private::BoxFuture<
                    '_,
                    ::core::result::Result<$res, $crate::core::error_mediator::MediatorError>,
                >;
            )*
        }

        impl $name for $crate::core::mediator::Mediator {
            $(
                fn $method(
                    &self,
                    request: $req,
                ) -> $crate::__private::BoxFuture<
                    '_,
                    ::core::result::Result<$res, $crate::core::error_mediator::MediatorError>,
                > {
                    ::std::boxed::Box::pin(self.send::<$req, $res>($key, request))
                }
            )*
        }
    };
}
