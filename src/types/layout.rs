// Copyright 2025 STARGA Inc.
// Licensed under the Apache License, Version 2.0 (the “License”);
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at:
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an “AS IS” BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Data and kernel layout tags.
//!
//! Layouts parse from and print to the conventional axis strings
//! (`"NCHW"`, `"NCHW8c"`, `"OIHW8i8o"`, ...). Blocked layouts keep their
//! block factors; candidates match on the layout *family*.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Error produced when a layout string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutParseError {
    #[error("unknown data layout `{0}`")]
    UnknownData(String),
    #[error("unknown kernel layout `{0}`")]
    UnknownKernel(String),
    #[error("block factor in layout `{0}` must be a positive integer")]
    InvalidBlock(String),
}

/// Axis ordering of an input (data) tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum DataLayout {
    Nchw,
    Nhwc,
    Hwcn,
    /// `NCHW[x]c`: channel axis tiled into blocks of `block`.
    NchwBlocked { block: usize },
}

/// Layout family used by candidates to match data layouts irrespective of
/// block factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataLayoutFamily {
    Nchw,
    Nhwc,
    Hwcn,
    NchwBlocked,
}

impl DataLayout {
    pub fn family(self) -> DataLayoutFamily {
        match self {
            DataLayout::Nchw => DataLayoutFamily::Nchw,
            DataLayout::Nhwc => DataLayoutFamily::Nhwc,
            DataLayout::Hwcn => DataLayoutFamily::Hwcn,
            DataLayout::NchwBlocked { .. } => DataLayoutFamily::NchwBlocked,
        }
    }

    /// Index of the (N, C, H, W) axes inside a shape stored in this layout.
    pub(crate) fn axes(self) -> [usize; 4] {
        match self {
            DataLayout::Nchw | DataLayout::NchwBlocked { .. } => [0, 1, 2, 3],
            DataLayout::Nhwc => [0, 3, 1, 2],
            DataLayout::Hwcn => [3, 2, 0, 1],
        }
    }
}

impl fmt::Display for DataLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataLayout::Nchw => f.write_str("NCHW"),
            DataLayout::Nhwc => f.write_str("NHWC"),
            DataLayout::Hwcn => f.write_str("HWCN"),
            DataLayout::NchwBlocked { block } => write!(f, "NCHW{block}c"),
        }
    }
}

impl From<DataLayout> for String {
    fn from(layout: DataLayout) -> Self {
        layout.to_string()
    }
}

impl FromStr for DataLayout {
    type Err = LayoutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NCHW" => return Ok(DataLayout::Nchw),
            "NHWC" => return Ok(DataLayout::Nhwc),
            "HWCN" => return Ok(DataLayout::Hwcn),
            _ => {}
        }
        let block = s
            .strip_prefix("NCHW")
            .and_then(|rest| rest.strip_suffix('c'))
            .ok_or_else(|| LayoutParseError::UnknownData(s.to_string()))?;
        Ok(DataLayout::NchwBlocked {
            block: parse_block(block, s)?,
        })
    }
}

/// Axis ordering of a convolution kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum KernelLayout {
    Oihw,
    Hwio,
    Hwoi,
    /// `OIHW[x]i[y]o`: input channels tiled by `in_block`, outputs by `out_block`.
    OihwBlocked { in_block: usize, out_block: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelLayoutFamily {
    Oihw,
    Hwio,
    Hwoi,
    OihwBlocked,
}

impl KernelLayout {
    pub fn family(self) -> KernelLayoutFamily {
        match self {
            KernelLayout::Oihw => KernelLayoutFamily::Oihw,
            KernelLayout::Hwio => KernelLayoutFamily::Hwio,
            KernelLayout::Hwoi => KernelLayoutFamily::Hwoi,
            KernelLayout::OihwBlocked { .. } => KernelLayoutFamily::OihwBlocked,
        }
    }

    /// Index of the (O, I, H, W) axes inside a shape stored in this layout.
    pub(crate) fn axes(self) -> [usize; 4] {
        match self {
            KernelLayout::Oihw | KernelLayout::OihwBlocked { .. } => [0, 1, 2, 3],
            KernelLayout::Hwio => [3, 2, 0, 1],
            KernelLayout::Hwoi => [2, 3, 0, 1],
        }
    }
}

impl fmt::Display for KernelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelLayout::Oihw => f.write_str("OIHW"),
            KernelLayout::Hwio => f.write_str("HWIO"),
            KernelLayout::Hwoi => f.write_str("HWOI"),
            KernelLayout::OihwBlocked {
                in_block,
                out_block,
            } => write!(f, "OIHW{in_block}i{out_block}o"),
        }
    }
}

impl fmt::Display for KernelLayoutFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelLayoutFamily::Oihw => f.write_str("OIHW"),
            KernelLayoutFamily::Hwio => f.write_str("HWIO"),
            KernelLayoutFamily::Hwoi => f.write_str("HWOI"),
            KernelLayoutFamily::OihwBlocked => f.write_str("OIHW[x]i[y]o"),
        }
    }
}

impl From<KernelLayout> for String {
    fn from(layout: KernelLayout) -> Self {
        layout.to_string()
    }
}

impl FromStr for KernelLayout {
    type Err = LayoutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OIHW" => return Ok(KernelLayout::Oihw),
            "HWIO" => return Ok(KernelLayout::Hwio),
            "HWOI" => return Ok(KernelLayout::Hwoi),
            _ => {}
        }
        let unknown = || LayoutParseError::UnknownKernel(s.to_string());
        let rest = s
            .strip_prefix("OIHW")
            .and_then(|rest| rest.strip_suffix('o'))
            .ok_or_else(unknown)?;
        let (in_block, out_block) = rest.split_once('i').ok_or_else(unknown)?;
        Ok(KernelLayout::OihwBlocked {
            in_block: parse_block(in_block, s)?,
            out_block: parse_block(out_block, s)?,
        })
    }
}

fn parse_block(digits: &str, layout: &str) -> Result<usize, LayoutParseError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LayoutParseError::InvalidBlock(layout.to_string()));
    }
    match digits.parse::<usize>() {
        Ok(block) if block > 0 => Ok(block),
        _ => Err(LayoutParseError::InvalidBlock(layout.to_string())),
    }
}
