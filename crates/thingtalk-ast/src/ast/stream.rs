//! Streams: the trigger side of a rule.

use super::filter::Filter;
use super::invocation::{display_params, InputParam, Invocation};
use super::table::{join_schema, Table};
use super::value::Value;
use crate::foundation::FunctionDef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Source of events that fire a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stream {
    /// Direct call to a trigger channel
    Invocation(Invocation),
    /// Call to a declared stream
    VarRef {
        name: String,
        in_params: Vec<InputParam>,
        #[serde(skip)]
        schema: Option<Arc<FunctionDef>>,
    },
    /// Fires whenever the result of a query changes
    Monitor { table: Box<Table> },
    /// Fires at the given times of day until the expiration date
    AtTimer {
        time: Value,
        expiration_date: Option<Value>,
    },
    /// Fires every `interval` starting at `base`
    Timer { base: Value, interval: Value },
    /// Fires only for events not seen before
    EdgeNew { stream: Box<Stream> },
    /// Fires when `filter` goes from false to true
    EdgeFilter { stream: Box<Stream>, filter: Filter },
    Filter { stream: Box<Stream>, filter: Filter },
    Join {
        stream: Box<Stream>,
        table: Box<Table>,
        on: Vec<InputParam>,
    },
}

impl Stream {
    /// Apply a filter, merging it into a bare invocation or an existing filter.
    pub fn filtered(stream: Stream, filter: Filter) -> Stream {
        match stream {
            Stream::Invocation(mut inv) => {
                inv.filter = Filter::and(vec![inv.filter, filter]);
                Stream::Invocation(inv)
            }
            Stream::Filter {
                stream,
                filter: existing,
            } => Stream::Filter {
                stream,
                filter: Filter::and(vec![existing, filter]),
            },
            other => Stream::Filter {
                stream: Box::new(other),
                filter,
            },
        }
    }

    /// Binding strength used when printing: 0 join, 1 filters and edges, 2 atoms.
    pub fn precedence(&self) -> u8 {
        match self {
            Stream::Join { .. } => 0,
            Stream::Filter { .. } | Stream::EdgeNew { .. } | Stream::EdgeFilter { .. } => 1,
            Stream::Invocation(inv) if !inv.filter.is_true() => 1,
            Stream::Invocation(_)
            | Stream::VarRef { .. }
            | Stream::Monitor { .. }
            | Stream::AtTimer { .. }
            | Stream::Timer { .. } => 2,
        }
    }

    /// Whether this stream is driven by a clock rather than by data.
    pub fn is_timer(&self) -> bool {
        match self {
            Stream::AtTimer { .. } | Stream::Timer { .. } => true,
            Stream::EdgeNew { stream }
            | Stream::EdgeFilter { stream, .. }
            | Stream::Filter { stream, .. }
            | Stream::Join { stream, .. } => stream.is_timer(),
            Stream::Invocation(_) | Stream::VarRef { .. } | Stream::Monitor { .. } => false,
        }
    }

    /// Signature of the events this stream produces. Timers produce none.
    pub fn schema(&self) -> Option<Arc<FunctionDef>> {
        match self {
            Stream::Invocation(inv) => inv.schema.clone(),
            Stream::VarRef { schema, .. } => schema.clone(),
            Stream::Monitor { table } => table.schema(),
            Stream::AtTimer { .. } | Stream::Timer { .. } => {
                Some(Arc::new(FunctionDef::derived(Vec::new(), false, false)))
            }
            Stream::EdgeNew { stream }
            | Stream::EdgeFilter { stream, .. }
            | Stream::Filter { stream, .. } => stream.schema(),
            Stream::Join { stream, table, on } => {
                Some(Arc::new(join_schema(&*stream.schema()?, &*table.schema()?, on)))
            }
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Invocation(inv) => write!(f, "{}", inv),
            Stream::VarRef {
                name, in_params, ..
            } => {
                write!(f, "VarRef({}, ", name)?;
                display_params(f, in_params)?;
                f.write_str(", )")
            }
            Stream::Monitor { table } => write!(f, "Monitor({})", table),
            Stream::AtTimer { time, .. } => write!(f, "AtTimer({})", time),
            Stream::Timer { base, interval } => write!(f, "Timer({}, {})", base, interval),
            Stream::EdgeNew { stream } => write!(f, "EdgeNew({})", stream),
            Stream::EdgeFilter { stream, filter } => write!(f, "EdgeFilter({}, {})", stream, filter),
            Stream::Filter { stream, filter } => write!(f, "Filter({}, {})", stream, filter),
            Stream::Join { stream, table, .. } => write!(f, "Join({}, {})", stream, table),
        }
    }
}
