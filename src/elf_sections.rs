// Copyright (c) 2026 MCU-Debug Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Section table straight from the ELF headers, for when no size tool is at
//! hand. Yields the same `Section` records as the sysv report parser.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use object::elf::SHF_ALLOC;
use object::{Object, ObjectSection, SectionFlags};

use crate::sections::Section;

pub fn sections_from_elf(path: &Path) -> Result<Vec<Section>> {
    let file_data = fs::read(path).with_context(|| format!("can't read {}", path.display()))?;
    let obj = object::File::parse(&*file_data).with_context(|| format!("{} is not an object file", path.display()))?;
    Ok(allocated_sections(&obj))
}

fn allocated_sections(obj: &object::File) -> Vec<Section> {
    obj.sections()
        .filter(|s| match s.flags() {
            SectionFlags::Elf { sh_flags } => sh_flags & u64::from(SHF_ALLOC) != 0,
            _ => true,
        })
        .filter_map(|s| {
            let name = s.name().ok()?;
            if name.is_empty() {
                return None;
            }
            Some(Section::new(name, s.size(), Some(s.address())))
        })
        .collect()
}
