//! Plain-text listings for the `genomes` and `assemblies` commands

use crate::core::SpeciesInfo;

/// Two-column table of species names and display names
pub fn format_species_table(species: &[SpeciesInfo]) -> String {
    let mut out = format!("{:<40} {}\n", "Name", "Display name");
    out.push_str(&format!("{} {} {}\n", "-".repeat(30), " ".repeat(9), "-".repeat(30)));
    for entry in species {
        out.push_str(&format!(
            "{:<40} {}\n",
            entry.name,
            entry.display_name.as_deref().unwrap_or("")
        ));
    }
    out
}

/// One assembly version per line
pub fn format_assemblies(assemblies: &[String]) -> String {
    assemblies.iter().map(|a| format!("{}\n", a)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_species_table() {
        let species = vec![
            SpeciesInfo {
                name: "homo_sapiens".into(),
                display_name: Some("Human".into()),
            },
            SpeciesInfo {
                name: "mus_musculus".into(),
                display_name: None,
            },
        ];
        let table = format_species_table(&species);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Name"));
        assert_eq!(lines[0].find("Display name"), Some(41));
        assert_eq!(lines[1].len(), 30 + 1 + 9 + 1 + 30);
        assert_eq!(lines[2], format!("{:<40} Human", "homo_sapiens"));
        assert_eq!(lines[3].trim_end(), "mus_musculus");
    }

    #[test]
    fn test_species_table_empty() {
        let table = format_species_table(&[]);
        assert_eq!(table.lines().count(), 2);
        assert!(table.ends_with('\n'));
    }

    #[test]
    fn test_assemblies() {
        let out = format_assemblies(&["GRCh38".to_string(), "GRCh37".to_string()]);
        assert_eq!(out, "GRCh38\nGRCh37\n");
        assert_eq!(format_assemblies(&[]), "");
    }
}
