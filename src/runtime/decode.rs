//! Single-pass JSON decoding with fragment fan-out.
//!
//! One JSON value may land in several destinations at once: when an object is
//! entered, every embedded member (fragment spread, inline fragment,
//! anonymous substruct) of the active structs joins the active set, and each
//! key is written to every member that claims it. Nothing is materialized
//! into an intermediate tree first.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use thiserror::Error;
use tracing::trace;

use super::envelope::GraphqlError;
use super::target::{BoxError, Destination, MapTarget, Member, Scalar, SequenceTarget, Target};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed JSON at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unmatched field `{key}` at {path}")]
    UnmatchedField { path: String, key: String },
    #[error("cannot decode {found} into {expected} at {path}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid value at {path}: {message}")]
    InvalidScalar { path: String, message: String },
    #[error("custom scalar failed at {path}: {source}")]
    Unmarshal {
        path: String,
        #[source]
        source: BoxError,
    },
    #[error("trailing content after the top-level value: {0}")]
    TrailingContent(#[source] serde_json::Error),
    #[error("response carries neither `data` nor `errors`")]
    MissingData,
}

/// Decodes `bytes` into `target`.
pub fn decode(bytes: &[u8], target: &mut (dyn Destination + 'static)) -> Result<(), DecodeError> {
    let session = Session::default();
    drive(bytes, &session, FanOut {
        session: &session,
        dests: vec![target],
    })
}

pub fn decode_into<T: Destination + 'static>(bytes: &[u8], target: &mut T) -> Result<(), DecodeError> {
    decode(bytes, target)
}

#[derive(Debug, Default)]
pub(crate) struct Envelope {
    pub errors: Vec<GraphqlError>,
    /// `data` was present and not null.
    pub has_data: bool,
}

/// Decodes a `{data, errors}` response body, streaming `data` into `data`.
pub(crate) fn decode_envelope(bytes: &[u8], data: &mut (dyn Destination + 'static)) -> Result<Envelope, DecodeError> {
    let session = Session::default();
    drive(bytes, &session, EnvelopeSeed {
        session: &session,
        data,
    })
}

// ------------------------------- Session --------------------------------- //

/// Why decoding stopped; serde only carries a message, this keeps the kind.
#[derive(Debug, Error)]
enum Failure {
    #[error("unmatched field `{0}`")]
    Unmatched(String),
    #[error("cannot decode {found} into {expected}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("{0}")]
    Scalar(String),
    #[error("{0}")]
    Unmarshal(BoxError),
}

#[derive(Default)]
struct Session {
    failure: RefCell<Option<Failure>>,
}

impl Session {
    fn fail<E: de::Error>(&self, failure: Failure) -> E {
        let error = E::custom(&failure);
        *self.failure.borrow_mut() = Some(failure);
        error
    }

    fn error(&self, path: String, source: serde_json::Error) -> DecodeError {
        match self.failure.borrow_mut().take() {
            Some(Failure::Unmatched(key)) => DecodeError::UnmatchedField { path, key },
            Some(Failure::Mismatch { expected, found }) => DecodeError::TypeMismatch { path, expected, found },
            Some(Failure::Scalar(message)) => DecodeError::InvalidScalar { path, message },
            Some(Failure::Unmarshal(source)) => DecodeError::Unmarshal { path, source },
            None => DecodeError::Json { path, source },
        }
    }
}

fn drive<'de, S: DeserializeSeed<'de>>(bytes: &'de [u8], session: &Session, seed: S) -> Result<S::Value, DecodeError> {
    let mut json = serde_json::Deserializer::from_slice(bytes);
    let mut track = serde_path_to_error::Track::new();
    let value = seed
        .deserialize(serde_path_to_error::Deserializer::new(&mut json, &mut track))
        .map_err(|source| session.error(track.path().to_string(), source))?;
    json.end().map_err(DecodeError::TrailingContent)?;
    Ok(value)
}

/// Peels optional wrappers: `null` clears them, anything else fills them in.
fn resolve<'d>(dest: &'d mut (dyn Destination + 'static), null: bool) -> Option<Target<'d>> {
    match dest.target() {
        Target::Optional(optional) => {
            if null {
                optional.set_none();
                None
            } else {
                resolve(optional.get_or_insert_default(), false)
            }
        }
        target => Some(target),
    }
}

// -------------------------------- Fan-out -------------------------------- //

/// The active destination set for one JSON value.
struct FanOut<'s, 'd> {
    session: &'s Session,
    dests: Vec<&'d mut (dyn Destination + 'static)>,
}

impl FanOut<'_, '_> {
    fn scalar<E: de::Error>(self, value: Scalar<'_>) -> Result<(), E> {
        let null = value == Scalar::Null;
        let session = self.session;
        for dest in self.dests {
            let Some(target) = resolve(dest, null) else {
                continue;
            };
            match target {
                Target::Scalar(scalar) => scalar
                    .assign(value)
                    .map_err(|message| session.fail(Failure::Scalar(message)))?,
                Target::Custom(custom) => custom
                    .unmarshal_graphql(value)
                    .map_err(|err| session.fail(Failure::Unmarshal(err)))?,
                Target::Sequence(sequence) if null => sequence.clear(),
                Target::Map(map) if null => map.clear(),
                Target::Struct(_) if null => {}
                other => {
                    return Err(session.fail(Failure::Mismatch {
                        expected: other.kind(),
                        found: value.kind(),
                    }));
                }
            }
        }
        Ok(())
    }
}

impl<'de> DeserializeSeed<'de> for FanOut<'_, '_> {
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        if self.dests.is_empty() {
            return deserializer.deserialize_ignored_any(IgnoredAny).map(|_| ());
        }
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for FanOut<'_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a GraphQL response value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        self.scalar(Scalar::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<(), E> {
        self.scalar(Scalar::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<(), E> {
        self.scalar(Scalar::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<(), E> {
        self.scalar(Scalar::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<(), E> {
        self.scalar(i64::try_from(v).map_or(Scalar::UInt(v), Scalar::Int))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<(), E> {
        self.scalar(Scalar::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<(), E> {
        self.scalar(Scalar::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        let FanOut { session, dests } = self;
        let mut sequences: Vec<&mut dyn SequenceTarget> = Vec::with_capacity(dests.len());
        for dest in dests {
            match resolve(dest, false) {
                Some(Target::Sequence(sequence)) => {
                    // decoding replaces, never appends to, what was there
                    sequence.clear();
                    sequences.push(sequence);
                }
                Some(other) => {
                    return Err(session.fail(Failure::Mismatch {
                        expected: other.kind(),
                        found: "array",
                    }));
                }
                None => {}
            }
        }
        while seq
            .next_element_seed(Element {
                session,
                sequences: &mut sequences,
            })?
            .is_some()
        {}
        Ok(())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        let FanOut { session, dests } = self;
        let mut members: Vec<Member<'_>> = Vec::new();
        let mut maps: Vec<&mut dyn MapTarget> = Vec::new();

        // embedded members join the active set breadth-first
        let mut pending: VecDeque<&mut (dyn Destination + 'static)> = dests.into();
        while let Some(dest) = pending.pop_front() {
            match resolve(dest, false) {
                Some(Target::Struct(target)) => {
                    for member in target.members() {
                        if member.embed.is_embedded() {
                            pending.push_back(member.slot);
                        } else {
                            members.push(member);
                        }
                    }
                }
                Some(Target::Map(target)) => {
                    // objects replace the map wholesale, like arrays do
                    target.clear();
                    maps.push(target);
                }
                Some(other) => {
                    return Err(session.fail(Failure::Mismatch {
                        expected: other.kind(),
                        found: "object",
                    }));
                }
                None => {}
            }
        }

        while let Some(key) = map.next_key::<String>()? {
            let mut targets: Vec<&mut (dyn Destination + 'static)> = members
                .iter_mut()
                .filter(|member| member.matches(&key))
                .map(|member| &mut *member.slot)
                .collect();
            targets.extend(maps.iter_mut().map(|target| target.entry(&key)));
            if targets.is_empty() {
                trace!(%key, "no destination claims key");
                return Err(session.fail(Failure::Unmatched(key)));
            }
            map.next_value_seed(FanOut { session, dests: targets })?;
        }
        Ok(())
    }
}

/// Appends one element to every active sequence, then decodes into all of them.
struct Element<'s, 'v, 'd> {
    session: &'s Session,
    sequences: &'v mut Vec<&'d mut dyn SequenceTarget>,
}

impl<'de> DeserializeSeed<'de> for Element<'_, '_, '_> {
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        let dests = self.sequences.iter_mut().map(|sequence| sequence.push_default()).collect();
        FanOut {
            session: self.session,
            dests,
        }
        .deserialize(deserializer)
    }
}

// ------------------------------- Envelope -------------------------------- //

struct EnvelopeSeed<'s, 'd> {
    session: &'s Session,
    data: &'d mut (dyn Destination + 'static),
}

impl<'de> DeserializeSeed<'de> for EnvelopeSeed<'_, '_> {
    type Value = Envelope;

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<Envelope, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for EnvelopeSeed<'_, '_> {
    type Value = Envelope;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a GraphQL response object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Envelope, A::Error> {
        let EnvelopeSeed { session, data } = self;
        let mut envelope = Envelope::default();
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "data" => {
                    envelope.has_data = map.next_value_seed(Data(FanOut {
                        session,
                        dests: vec![&mut *data],
                    }))?;
                }
                "errors" => {
                    envelope.errors = map.next_value::<Option<Vec<GraphqlError>>>()?.unwrap_or_default();
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(envelope)
    }
}

/// `data` member: reports whether it was non-null.
struct Data<'s, 'd>(FanOut<'s, 'd>);

impl<'de> DeserializeSeed<'de> for Data<'_, '_> {
    type Value = bool;

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<bool, D::Error> {
        deserializer.deserialize_option(self)
    }
}

impl<'de> Visitor<'de> for Data<'_, '_> {
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("response data or null")
    }

    fn visit_none<E: de::Error>(self) -> Result<bool, E> {
        Ok(false)
    }

    fn visit_unit<E: de::Error>(self) -> Result<bool, E> {
        Ok(false)
    }

    fn visit_some<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<bool, D::Error> {
        self.0.deserialize(deserializer).map(|()| true)
    }
}
