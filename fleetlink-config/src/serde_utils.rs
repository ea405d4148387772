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

//! `deserialize_with` helpers. Every string read through them has `$VAR`
//! and `${VAR}` references replaced from the environment, so secrets can
//! stay out of the config file.

use core::fmt;
use core::marker::PhantomData;
use core::str::FromStr;
use core::time::Duration;

use serde::{Deserialize, Deserializer, de};

fn expand<E: de::Error>(raw: &str) -> Result<String, E> {
    shellexpand::env(raw)
        .map(|expanded| expanded.into_owned())
        .map_err(de::Error::custom)
}

pub fn convert_string_with_shellexpand<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    expand(&String::deserialize(deserializer)?)
}

pub fn convert_optional_string_with_shellexpand<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<String>::deserialize(deserializer)?
        .map(|raw| expand(&raw))
        .transpose()
}

/// Accepts a plain number or a string that expands to one, e.g.
/// `"$JENKINS_PORT"`.
pub fn convert_numeric_with_shellexpand<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64> + FromStr,
    <T as TryFrom<u64>>::Error: fmt::Display,
    <T as FromStr>::Err: fmt::Display,
{
    struct NumericVisitor<T>(PhantomData<T>);

    impl<T> de::Visitor<'_> for NumericVisitor<T>
    where
        T: TryFrom<u64> + FromStr,
        <T as TryFrom<u64>>::Error: fmt::Display,
        <T as FromStr>::Err: fmt::Display,
    {
        type Value = T;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a non-negative number or a string holding one")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<T, E> {
            T::try_from(v).map_err(de::Error::custom)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<T, E> {
            self.visit_u64(u64::try_from(v).map_err(de::Error::custom)?)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
            expand::<E>(v)?.trim().parse().map_err(de::Error::custom)
        }
    }

    deserializer.deserialize_any(NumericVisitor(PhantomData))
}

/// Accepts whole seconds or a `humantime` string such as `"30s"` or
/// `"1m 30s"`.
pub fn convert_duration_with_shellexpand<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl de::Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a number of seconds or a human readable duration")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            self.visit_u64(u64::try_from(v).map_err(de::Error::custom)?)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            humantime::parse_duration(expand::<E>(v)?.trim()).map_err(de::Error::custom)
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}
