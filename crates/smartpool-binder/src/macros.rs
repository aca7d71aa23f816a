//! `pooled_fn!`: pooling a function at its definition

/// Defines a function whose results are pooled by its arguments.
///
/// The factory must return `Result<R, E>`. The generated function keeps the
/// name, visibility, attributes and parameter list, and returns
/// `PoolResult<Arc<R>>` from a pool created on first call. The pool is keyed by
/// the tuple of arguments, so every parameter type must be owned and implement
/// `Clone + Hash + Eq + Debug + Send + Sync + 'static`.
///
/// # Examples
///
/// ```
/// use smartpool_binder::pooled_fn;
/// use std::sync::Arc;
///
/// pooled_fn! {
///     /// Opens a read buffer for a shard.
///     pub fn open_shard(name: String, shard: u32) -> Result<Vec<u8>, std::io::Error> {
///         Ok(format!("{name}/{shard}").into_bytes())
///     }
/// }
///
/// let a = open_shard("events".to_string(), 3).unwrap();
/// let b = open_shard("events".to_string(), 3).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(a.as_slice(), b"events/3");
/// ```
#[macro_export]
macro_rules! pooled_fn {
	(
		$(#[$meta:meta])*
		$vis:vis fn $name:ident ( $($arg:ident : $ty:ty),* $(,)? ) -> Result<$ret:ty, $err:ty> $body:block
	) => {
		$(#[$meta])*
		$vis fn $name($($arg: $ty),*) -> $crate::PoolResult<::std::sync::Arc<$ret>> {
			fn __factory(($($arg,)*): &($($ty,)*)) -> ::std::result::Result<$ret, $err> {
				$(let $arg: $ty = ::std::clone::Clone::clone($arg);)*
				$body
			}

			static POOL: $crate::__private::Lazy<$crate::Pool<($($ty,)*), $ret>> =
				$crate::__private::Lazy::new(|| {
					$crate::Pool::new(__factory)
						.with_name(concat!(module_path!(), "::", stringify!($name)))
				});

			POOL.get(&($($arg,)*))
		}
	};
}
