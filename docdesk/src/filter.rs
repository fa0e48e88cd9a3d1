use docdesk_core::{Project, ProjectStatus, UploadedFile};

const DEFAULT_PAGE_SIZE: usize = 20;
const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ProjectStatus),
}

impl StatusFilter {
    fn accepts(self, status: ProjectStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Case-insensitive match on the file name. A blank term keeps everything.
pub fn filter_files<'a>(files: &'a [UploadedFile], term: &str) -> Vec<&'a UploadedFile> {
    let needle = term.trim().to_lowercase();
    files
        .iter()
        .filter(|file| contains_folded(&file.file_name, &needle))
        .collect()
}

pub fn filter_projects<'a>(
    projects: &'a [Project],
    term: &str,
    status: StatusFilter,
) -> Vec<&'a Project> {
    let needle = term.trim().to_lowercase();
    projects
        .iter()
        .filter(|project| status.accepts(project.status))
        .filter(|project| {
            contains_folded(&project.name, &needle)
                || project
                    .description
                    .as_deref()
                    .is_some_and(|text| contains_folded(text, &needle))
        })
        .collect()
}

/// One-based page cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    pub fn next(&mut self) {
        self.number += 1;
    }

    pub fn prev(&mut self) {
        self.number = self.number.saturating_sub(1).max(1);
    }

    pub fn reset(&mut self) {
        self.number = 1;
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self
            .number
            .saturating_sub(1)
            .saturating_mul(self.size)
            .min(items.len());
        let end = start.saturating_add(self.size).min(items.len());
        &items[start..end]
    }

    pub fn has_next(&self, total: usize) -> bool {
        self.number.saturating_mul(self.size) < total
    }
}

/// Human-readable size, base 1024 with up to two decimals.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    // Promote on the rounded value.
    let rounded = loop {
        let rounded = (value * 100.0).round() / 100.0;
        if rounded < 1024.0 || unit == SIZE_UNITS.len() - 1 {
            break rounded;
        }
        value /= 1024.0;
        unit += 1;
    };
    let text = format!("{rounded:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {}", SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> UploadedFile {
        serde_json::from_value(serde_json::json!({ "id": name, "file_name": name })).unwrap()
    }

    fn project(name: &str, description: Option<&str>, status: &str) -> Project {
        serde_json::from_value(serde_json::json!({
            "id": name,
            "name": name,
            "description": description,
            "status": status,
        }))
        .unwrap()
    }

    #[test]
    fn files_match_name_case_insensitively() {
        let files = vec![file("Report.PDF"), file("notes.txt")];
        let hits = filter_files(&files, " report ");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "Report.PDF");
        assert_eq!(filter_files(&files, "").len(), 2);
    }

    #[test]
    fn projects_match_description_and_status() {
        let projects = vec![
            project("Thesis", Some("chapter drafts"), "draft"),
            project("Grant", None, "published"),
        ];
        let hits = filter_projects(&projects, "CHAPTER", StatusFilter::All);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Thesis");

        let published = filter_projects(&projects, "", StatusFilter::Only(ProjectStatus::Published));
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].name, "Grant");
    }

    #[test]
    fn page_moves_and_never_drops_below_one() {
        let mut page = Page::default();
        page.prev();
        assert_eq!(page.number, 1);
        page.next();
        page.next();
        assert_eq!(page.number, 3);
        page.reset();
        assert_eq!(page, Page::default());
    }

    #[test]
    fn page_slices_items() {
        let items: Vec<u32> = (0..45).collect();
        let mut page = Page::default();
        assert_eq!(page.slice(&items).len(), 20);
        page.number = 3;
        assert_eq!(page.slice(&items), &[40, 41, 42, 43, 44]);
        assert!(!page.has_next(items.len()));
        page.number = 9;
        assert!(page.slice(&items).is_empty());
    }

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(1_048_575), "1 MB");
        assert_eq!(format_file_size(1023), "1023 Bytes");
    }
}
