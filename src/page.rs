//! Listing page rendering and display helpers.
//!
//! Pure presentation: receives the entries and the current relative path and
//! produces the HTML payload. Search, sort and the theme toggle run
//! client-side against data attributes on the file cards.

use chrono::{DateTime, Local};

use crate::storage::FileEntry;

const LISTING_SHELL: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>File Server</title>
    <style>
        :root {
            --bg: #f4f6f9;
            --text: #222;
            --card: #fff;
        }
        body {
            font-family: Arial, sans-serif;
            background: var(--bg);
            color: var(--text);
            text-align: center;
            padding: 20px;
            transition: background 0.3s, color 0.3s;
        }
        h2 { color: var(--text); }
        .file-card {
            background: var(--card);
            margin: 10px auto;
            padding: 15px;
            border-radius: 12px;
            box-shadow: 0 4px 6px rgba(0,0,0,0.1);
            width: 90%;
            max-width: 600px;
            display: flex;
            justify-content: space-between;
            align-items: center;
            transition: 0.2s;
        }
        .file-card:hover {
            transform: scale(1.02);
            box-shadow: 0 6px 12px rgba(0,0,0,0.15);
        }
        a {
            text-decoration: none;
            color: #007bff;
            font-weight: bold;
        }
        a:hover { color: #0056b3; }
        .delete-btn {
            background: #ff4d4d;
            border: none;
            padding: 8px 12px;
            border-radius: 8px;
            color: white;
            font-weight: bold;
            cursor: pointer;
        }
        .delete-btn:hover { background: #cc0000; }
        .upload-link {
            display: inline-block;
            margin-top: 20px;
            padding: 12px 20px;
            background: #28a745;
            color: white;
            border-radius: 10px;
            text-decoration: none;
            font-weight: bold;
        }
        .upload-link:hover { background: #218838; }
        .theme-toggle {
            margin: 20px;
            padding: 10px 18px;
            background: #333;
            color: white;
            border: none;
            border-radius: 10px;
            cursor: pointer;
        }
        .search-bar, .sort-select {
            margin: 10px;
            padding: 10px;
            border-radius: 8px;
            border: 1px solid #ccc;
            width: 200px;
        }
    </style>
</head>
<body>
    <h2>📂 Available Files __TITLE_SUFFIX__</h2>

    <input type="text" class="search-bar" placeholder="🔍 Search files..." onkeyup="searchFiles()">
    <select class="sort-select" onchange="sortFiles(this.value)">
        <option value="name">Sort by Name</option>
        <option value="size">Sort by Size</option>
        <option value="date">Sort by Date</option>
    </select>

    <div id="file-list">
__FILE_CARDS__
    </div>

    <br>
    <a class="upload-link" href="/upload">⬆️ Upload Files</a>
    <br>
    <button class="theme-toggle" onclick="toggleTheme()">🌙 Dark Mode</button>

    <script>
      const root = document.documentElement;
      function setTheme(dark) {
        if (dark) {
          root.style.setProperty('--bg', '#121212');
          root.style.setProperty('--text', '#f1f1f1');
          root.style.setProperty('--card', '#1e1e1e');
          document.querySelector('.theme-toggle').innerText = "☀️ Light Mode";
        } else {
          root.style.setProperty('--bg', '#f4f6f9');
          root.style.setProperty('--text', '#222');
          root.style.setProperty('--card', '#fff');
          document.querySelector('.theme-toggle').innerText = "🌙 Dark Mode";
        }
        localStorage.setItem("darkmode", dark);
      }
      function toggleTheme() {
        const isDark = localStorage.getItem("darkmode") === "true";
        setTheme(!isDark);
      }
      window.onload = () => {
        const isDark = localStorage.getItem("darkmode") === "true";
        setTheme(isDark);
      };

      async function deleteFile(filename) {
        if (!confirm("Are you sure you want to delete " + filename + "?")) return;
        let res = await fetch("/delete", {
          method: "POST",
          headers: { "Content-Type": "application/json" },
          body: JSON.stringify({ "filename": filename })
        });
        let data = await res.json();
        alert(data.message);
        location.reload();
      }

      function searchFiles() {
        let input = document.querySelector(".search-bar").value.toLowerCase();
        document.querySelectorAll(".file-card").forEach(card => {
          card.style.display = card.dataset.name.includes(input) ? "flex" : "none";
        });
      }

      function sortFiles(type) {
        let list = document.getElementById("file-list");
        let cards = Array.from(list.children);
        cards.sort((a,b) => {
          if (type=="name") return a.dataset.name.localeCompare(b.dataset.name);
          if (type=="size") return b.dataset.size - a.dataset.size;
          if (type=="date") return b.dataset.date - a.dataset.date;
        });
        list.innerHTML="";
        cards.forEach(c=>list.appendChild(c));
      }
    </script>
</body>
</html>
"#;

/// Renders the full listing page for one directory.
pub fn listing_page(relative: &str, entries: &[FileEntry]) -> String {
    let rel = relative.trim().trim_matches('/');
    let mut cards = String::new();

    if !rel.is_empty() {
        let parent = match rel.rsplit_once('/') {
            Some((parent, _)) => parent,
            None => "",
        };
        let href = if parent.is_empty() {
            "/files".to_string()
        } else {
            format!("/files/{}", encode_path(parent))
        };
        cards.push_str(&format!(
            "<div class=\"file-card\"><a href=\"{href}\">⬅️ Back</a></div>\n"
        ));
    }

    if entries.is_empty() {
        cards.push_str("<p>No files here.</p>\n");
    }

    for entry in entries {
        let icon = icon_for(&entry.name, entry.is_dir);
        let safe_rel = encode_path(&entry.path);
        let (link, download_attr, size_str) = if entry.is_dir {
            (format!("/files/{safe_rel}"), "", String::new())
        } else {
            (
                format!("/download/{safe_rel}"),
                " download",
                format!(" ({})", format_size(entry.size)),
            )
        };
        let date_str = entry.modified.map(format_date).unwrap_or_default();
        let epoch = entry.modified.map(|ts| ts.timestamp()).unwrap_or(0);
        let name = escape_html(&entry.name);
        let name_lower = escape_html(&entry.name.to_lowercase());

        cards.push_str(&format!(
            "<div class=\"file-card\" data-name=\"{name_lower}\" data-size=\"{size}\" data-date=\"{epoch}\">\n\
             <a href=\"{link}\"{download_attr}>{icon} {name}{size_str} – <small>{date_str}</small></a>\n\
             <button class=\"delete-btn\" onclick=\"deleteFile('{safe_rel}')\">🗑 Delete</button>\n\
             </div>\n",
            size = entry.size,
        ));
    }

    let title_suffix = if rel.is_empty() {
        String::new()
    } else {
        escape_html(&format!("/{rel}"))
    };

    LISTING_SHELL
        .replace("__TITLE_SUFFIX__", &title_suffix)
        .replace("__FILE_CARDS__", &cards)
}

/// Picks a display emoji by entry kind and file extension.
pub fn icon_for(name: &str, is_dir: bool) -> &'static str {
    if is_dir {
        return "📂";
    }
    let lower = name.to_lowercase();
    let has_ext = |exts: &[&str]| exts.iter().any(|ext| lower.ends_with(ext));
    if has_ext(&[".mp4", ".mkv", ".avi", ".mov"]) {
        "🎬"
    } else if has_ext(&[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"]) {
        "🖼️"
    } else if lower.ends_with(".py") {
        "🐍"
    } else if lower.ends_with(".pdf") {
        "📕"
    } else if has_ext(&[".mp3", ".wav", ".ogg"]) {
        "🎵"
    } else {
        "📄"
    }
}

/// Human-readable size, two decimals, 1024-based units.
pub fn format_size(size: u64) -> String {
    let mut value = size as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} PB")
}

fn format_date(timestamp: DateTime<Local>) -> String {
    timestamp.format("%d-%m-%Y %H:%M").to_string()
}

/// Percent-encodes each path segment, leaving the separators alone so hrefs
/// keep their directory structure.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(name: &str, is_dir: bool, size: u64) -> FileEntry {
        FileEntry {
            name: name.to_string(),
            path: name.to_string(),
            is_dir,
            size,
            modified: Some(Local.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).single().expect("ts")),
        }
    }

    #[test]
    fn format_size_steps_through_units() {
        assert_eq!(format_size(10), "10.00 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn icon_matches_extension() {
        assert_eq!(icon_for("movie.MKV", false), "🎬");
        assert_eq!(icon_for("song.ogg", false), "🎵");
        assert_eq!(icon_for("anything", true), "📂");
        assert_eq!(icon_for("readme.txt", false), "📄");
    }

    #[test]
    fn listing_links_directories_and_files_differently() {
        let entries = vec![entry("docs", true, 0), entry("a b.txt", false, 3)];
        let html = listing_page("", &entries);
        assert!(html.contains("href=\"/files/docs\""));
        assert!(html.contains("href=\"/download/a%20b.txt\" download"));
        assert!(html.contains("(3.00 B)"));
        assert!(!html.contains("Back"));
    }

    #[test]
    fn listing_in_subdirectory_links_back_to_parent() {
        let html = listing_page("docs/notes", &[]);
        assert!(html.contains("href=\"/files/docs\""));
        assert!(html.contains("⬅️ Back"));
        assert!(html.contains("No files here."));
        assert!(html.contains("/docs/notes"));
    }

    #[test]
    fn entry_names_are_html_escaped() {
        let entries = vec![entry("<img>.txt", false, 1)];
        let html = listing_page("", &entries);
        assert!(html.contains("&lt;img&gt;.txt"));
        assert!(!html.contains("<img>.txt"));
    }
}
