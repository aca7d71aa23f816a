//! Dynamic call arguments
//!
//! [`CallArgs`] models a call made with ordered positional arguments and
//! named arguments, for factories whose inputs are not known until runtime.
//! Positional order is significant; named argument order is not.

use crate::error::{PoolError, PoolResult};
use crate::fingerprint::Fingerprint;
use std::collections::BTreeMap;

/// A single argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
	Null,
	Bool(bool),
	Int(i64),
	UInt(u64),
	Float(f64),
	Str(String),
	Bytes(Vec<u8>),
	List(Vec<ArgValue>),
}

impl ArgValue {
	/// Builds a list argument from any iterator of values.
	pub fn list<I, V>(values: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<ArgValue>,
	{
		Self::List(values.into_iter().map(Into::into).collect())
	}

	fn canonical(&self) -> PoolResult<KeyAtom> {
		Ok(match self {
			Self::Null => KeyAtom::Null,
			Self::Bool(b) => KeyAtom::Bool(*b),
			Self::Int(i) => KeyAtom::Int(*i),
			Self::UInt(u) => match i64::try_from(*u) {
				Ok(i) => KeyAtom::Int(i),
				Err(_) => KeyAtom::UInt(*u),
			},
			Self::Float(f) if f.is_nan() => {
				return Err(PoolError::UnhashableArgument(
					"NaN is not equal to itself and cannot be used as a key".to_string(),
				));
			}
			// -0.0 == 0.0, so both must map to the same key
			Self::Float(f) if *f == 0.0 => KeyAtom::Float(0.0f64.to_bits()),
			Self::Float(f) => KeyAtom::Float(f.to_bits()),
			Self::Str(s) => KeyAtom::Str(s.clone()),
			Self::Bytes(b) => KeyAtom::Bytes(b.clone()),
			Self::List(items) => KeyAtom::List(
				items
					.iter()
					.map(ArgValue::canonical)
					.collect::<PoolResult<Vec<_>>>()?,
			),
		})
	}
}

macro_rules! arg_value_from {
	($variant:ident: $($ty:ty => $conv:ty),* $(,)?) => {
		$(
			impl From<$ty> for ArgValue {
				fn from(value: $ty) -> Self {
					Self::$variant(<$conv>::from(value))
				}
			}
		)*
	};
}

arg_value_from!(Int: i8 => i64, i16 => i64, i32 => i64, i64 => i64);
arg_value_from!(UInt: u8 => u64, u16 => u64, u32 => u64, u64 => u64);
arg_value_from!(Float: f32 => f64, f64 => f64);
arg_value_from!(Str: String => String, &str => String);
arg_value_from!(Bytes: Vec<u8> => Vec<u8>, &[u8] => Vec<u8>);

impl From<bool> for ArgValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyAtom {
	Null,
	Bool(bool),
	Int(i64),
	UInt(u64),
	Float(u64),
	Str(String),
	Bytes(Vec<u8>),
	List(Vec<KeyAtom>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CanonicalArgs {
	positional: Vec<KeyAtom>,
	named: Vec<(String, KeyAtom)>,
}

/// Positional and named arguments of a dynamic call.
///
/// # Examples
///
/// ```
/// use smartpool_core::CallArgs;
///
/// let a = CallArgs::new().arg("redis").arg(6379u16).named("db", 2);
/// let b = CallArgs::new().arg("redis").arg(6379u16).named("db", 2);
/// assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
///
/// let swapped = CallArgs::new().arg(6379u16).arg("redis").named("db", 2);
/// assert_ne!(a.fingerprint().unwrap(), swapped.fingerprint().unwrap());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
	positional: Vec<ArgValue>,
	named: BTreeMap<String, ArgValue>,
}

impl CallArgs {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a positional argument.
	pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
		self.positional.push(value.into());
		self
	}

	/// Sets a named argument, replacing any previous value under that name.
	pub fn named(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
		self.named.insert(name.into(), value.into());
		self
	}

	pub fn positional(&self) -> &[ArgValue] {
		&self.positional
	}

	pub fn get(&self, index: usize) -> Option<&ArgValue> {
		self.positional.get(index)
	}

	pub fn get_named(&self, name: &str) -> Option<&ArgValue> {
		self.named.get(name)
	}

	pub fn is_empty(&self) -> bool {
		self.positional.is_empty() && self.named.is_empty()
	}

	/// Computes the canonical fingerprint of this argument set.
	///
	/// Fails with [`PoolError::UnhashableArgument`] if any value is NaN.
	/// Unsigned values that fit in `i64` key the same as the equal signed value.
	pub fn fingerprint(&self) -> PoolResult<Fingerprint> {
		let positional = self
			.positional
			.iter()
			.map(ArgValue::canonical)
			.collect::<PoolResult<Vec<_>>>()?;
		let named = self
			.named
			.iter()
			.map(|(name, value)| Ok((name.clone(), value.canonical()?)))
			.collect::<PoolResult<Vec<_>>>()?;
		Ok(Fingerprint::of(CanonicalArgs { positional, named }))
	}
}
