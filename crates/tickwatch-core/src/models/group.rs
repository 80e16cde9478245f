//! Statically declared collections of timers
//!
//! A group's membership is its type: timers and nested groups are plain fields,
//! and [`TimerGroup::for_each_member`] walks them in declaration order. Code
//! being measured talks to the `Timer` fields directly; only reporting goes
//! through the group.
//!
//! Most groups are declared with [`timer_group!`](crate::timer_group), which
//! writes the `TimerGroup` impl from the field list.

use crate::clock::{Clock, MonotonicClock};

use super::Timer;

/// A direct member of a group.
pub enum Member<'a, C: Clock = MonotonicClock> {
    Timer(&'a Timer<C>),
    Group(&'a dyn TimerGroup<C>),
}

pub trait TimerGroup<C: Clock = MonotonicClock> {
    /// Label prepended to member names when the group is displayed nested.
    fn name_prefix(&self) -> Option<&str> {
        None
    }

    /// Visit every direct timer and nested group, in declaration order.
    fn for_each_member<'a>(&'a self, visit: &mut dyn FnMut(Member<'a, C>));

    /// Every timer reachable from this group.
    ///
    /// Direct timers come first, then each nested group's timers, recursively,
    /// in declaration order.
    fn timers(&self) -> Vec<&Timer<C>> {
        let mut out = Vec::new();
        flatten_into(self, &mut out);
        out
    }

    /// [`TimerGroup::timers`] paired with display labels built from the nested
    /// groups' prefixes and each timer's name, joined by `separator`.
    fn labeled_timers(&self, separator: &str) -> Vec<(String, &Timer<C>)> {
        let mut out = Vec::new();
        let scope = self.name_prefix().unwrap_or_default();
        label_into(self, scope, separator, &mut out);
        out
    }

    fn len(&self) -> usize {
        self.timers().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reset every reachable timer, in enumeration order.
    fn reset(&self) {
        let timers = self.timers();
        tracing::debug!(
            group = self.name_prefix().unwrap_or_default(),
            timers = timers.len(),
            "resetting timer group"
        );
        for timer in timers {
            timer.reset();
        }
    }
}

/// Split a group's direct members into timers and nested groups, keeping order.
fn split_members<'a, C, G>(group: &'a G) -> (Vec<&'a Timer<C>>, Vec<&'a dyn TimerGroup<C>>)
where
    C: Clock,
    G: TimerGroup<C> + ?Sized,
{
    let mut timers = Vec::new();
    let mut groups = Vec::new();
    group.for_each_member(&mut |member| match member {
        Member::Timer(timer) => timers.push(timer),
        Member::Group(nested) => groups.push(nested),
    });
    (timers, groups)
}

fn flatten_into<'a, C, G>(group: &'a G, out: &mut Vec<&'a Timer<C>>)
where
    C: Clock,
    G: TimerGroup<C> + ?Sized,
{
    let (timers, groups) = split_members(group);
    out.extend(timers);
    for nested in groups {
        flatten_into(nested, out);
    }
}

fn label_into<'a, C, G>(
    group: &'a G,
    scope: &str,
    separator: &str,
    out: &mut Vec<(String, &'a Timer<C>)>,
) where
    C: Clock,
    G: TimerGroup<C> + ?Sized,
{
    let (timers, groups) = split_members(group);
    for timer in timers {
        out.push((join_label(scope, timer.label(), separator), timer));
    }
    for nested in groups {
        let nested_scope = match nested.name_prefix() {
            Some(prefix) if !prefix.is_empty() => join_label(scope, prefix, separator),
            _ => scope.to_string(),
        };
        label_into(nested, &nested_scope, separator, out);
    }
}

fn join_label(scope: &str, name: &str, separator: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}{separator}{name}")
    }
}

/// Declare a struct of [`Timer`](crate::Timer)s and nested groups that
/// implements [`TimerGroup`](crate::TimerGroup).
///
/// Each timer is named after its field and each nested group gets its field
/// name as prefix. Nested group types must provide `with_prefix`, which every
/// group declared with this macro does.
///
/// ```
/// use tickwatch_core::{timer_group, TimerGroup};
///
/// timer_group! {
///     #[derive(Debug)]
///     pub struct StorageTimers {
///         timers { read, write }
///     }
/// }
///
/// timer_group! {
///     #[derive(Debug)]
///     pub struct RequestTimers {
///         timers { parse, respond }
///         groups { storage: StorageTimers }
///     }
/// }
///
/// let timers = RequestTimers::new();
/// timers.parse.time(|| ());
///
/// let labels: Vec<String> = timers
///     .labeled_timers(".")
///     .into_iter()
///     .map(|(label, _)| label)
///     .collect();
/// assert_eq!(labels, ["parse", "respond", "storage.read", "storage.write"]);
/// ```
#[macro_export]
macro_rules! timer_group {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            timers { $($timer:ident),* $(,)? }
            $(groups { $($group:ident : $group_ty:ty),* $(,)? })?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            name_prefix: ::std::option::Option<::std::string::String>,
            $(pub $timer: $crate::Timer,)*
            $($(pub $group: $group_ty,)*)?
        }

        #[allow(dead_code)]
        impl $name {
            pub fn new() -> Self {
                Self::build(::std::option::Option::None)
            }

            pub fn with_prefix(prefix: impl ::std::convert::Into<::std::string::String>) -> Self {
                Self::build(::std::option::Option::Some(prefix.into()))
            }

            fn build(name_prefix: ::std::option::Option<::std::string::String>) -> Self {
                Self {
                    name_prefix,
                    $($timer: $crate::Timer::named(::std::stringify!($timer)),)*
                    $($($group: <$group_ty>::with_prefix(::std::stringify!($group)),)*)?
                }
            }
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $crate::TimerGroup for $name {
            fn name_prefix(&self) -> ::std::option::Option<&str> {
                self.name_prefix.as_deref()
            }

            fn for_each_member<'a>(&'a self, visit: &mut dyn FnMut($crate::Member<'a>)) {
                $(visit($crate::Member::Timer(&self.$timer));)*
                $($(visit($crate::Member::Group(&self.$group));)*)?
            }
        }

        impl<'a> ::std::iter::IntoIterator for &'a $name {
            type Item = &'a $crate::Timer;
            type IntoIter = ::std::vec::IntoIter<&'a $crate::Timer>;

            fn into_iter(self) -> Self::IntoIter {
                $crate::TimerGroup::timers(self).into_iter()
            }
        }
    };
}
