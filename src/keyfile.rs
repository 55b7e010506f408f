use crate::errors::AuthorityError;

/// An ordered "key file" document: `[section]` headers followed by
/// `key=value` entries.
///
/// Both the rule store (`.pkla` files, one rule per section, file order is
/// significant) and the config source (`.conf` files) consume this shape, so
/// sections and entries keep their textual order. `#` and `;` lines are
/// comments; duplicate keys within a section resolve to the last occurrence.
#[derive(Debug, Clone, Default)]
pub struct KeyFile {
    sections: Vec<Section>,
}

#[derive(Debug, Clone)]
pub struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl KeyFile {
    pub fn parse(source: &str) -> Result<KeyFile, AuthorityError> {
        let mut sections: Vec<Section> = Vec::new();

        for (number, raw) in source.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header.strip_suffix(']').ok_or_else(|| {
                    AuthorityError::KeyFileParse(format!(
                        "unterminated section header on line {}",
                        number + 1
                    ))
                })?;
                if name.is_empty() {
                    return Err(AuthorityError::KeyFileParse(format!(
                        "empty section name on line {}",
                        number + 1
                    )));
                }
                sections.push(Section {
                    name: name.to_string(),
                    entries: Vec::new(),
                });
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| {
                AuthorityError::KeyFileParse(format!(
                    "expected `key=value` on line {}",
                    number + 1
                ))
            })?;
            let key = key.trim_end();
            if key.is_empty() {
                return Err(AuthorityError::KeyFileParse(format!(
                    "empty key on line {}",
                    number + 1
                )));
            }
            let section = sections.last_mut().ok_or_else(|| {
                AuthorityError::KeyFileParse(format!(
                    "entry outside of a section on line {}",
                    number + 1
                ))
            })?;
            section
                .entries
                .push((key.to_string(), value.trim_start().to_string()));
        }

        Ok(KeyFile { sections })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// The value for `key` in the last section named `section` that carries
    /// it.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .rev()
            .filter(|s| s.name == section)
            .find_map(|s| s.get(key))
    }
}

impl Section {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Split a multi-value entry on `;` or `,`, dropping empty items.
pub fn split_value_list(value: &str) -> Vec<&str> {
    value
        .split([';', ','])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}
