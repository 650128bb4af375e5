//! 终端输出辅助

use crossterm::style::Stylize;

const BANNER_WIDTH: usize = 56;

/// 终端显示宽度：非 ASCII 字符按两格计
fn cell_width(c: char) -> usize {
    if c.is_ascii() {
        1
    } else {
        2
    }
}

fn text_width(s: &str) -> usize {
    s.chars().map(cell_width).sum()
}

/// 截断到 `width` 格以内，末尾以 `…` 标记
pub fn truncate(s: &str, width: usize) -> String {
    if text_width(s) <= width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = cell_width(c);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// 按显示宽度右侧补空格
fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(text_width(s));
    format!("{}{}", s, " ".repeat(fill))
}

pub fn print_header(title: &str) {
    let rule = "━".repeat(BANNER_WIDTH);
    println!();
    println!("{}", rule.as_str().dark_magenta());
    println!("  {}", title.bold());
    println!("{}", rule.as_str().dark_magenta());
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "!".yellow().bold(), msg);
}

pub fn print_kv(key: &str, value: &str) {
    println!("  {} {}", pad(&format!("{}:", key), 14).dark_grey(), value);
}

/// 表格行；`header` 为真时加粗并在下方画分隔线
fn print_row(cells: &[(&str, usize)], header: bool) {
    let line = cells
        .iter()
        .map(|(text, width)| pad(text, *width))
        .collect::<Vec<_>>()
        .join("  ");
    if header {
        println!("  {}", line.as_str().bold());
        let underline = cells
            .iter()
            .map(|(_, width)| "─".repeat(*width))
            .collect::<Vec<_>>()
            .join("  ");
        println!("  {}", underline.dark_grey());
    } else {
        println!("  {}", line);
    }
}

pub fn print_table_header(columns: &[(&str, usize)]) {
    print_row(columns, true);
}

pub fn print_table_row(cells: &[(&str, usize)]) {
    print_row(cells, false);
}

pub fn print_empty(msg: &str) {
    println!("\n  {}\n", msg.dark_grey().italic());
}

pub fn print_hint(msg: &str) {
    println!("  {} {}", "→".cyan(), msg.dark_grey());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_wide_chars() {
        assert_eq!(truncate("Hades", 10), "Hades");
        assert_eq!(truncate("The Legend of Zelda", 10), "The Legen…");
        assert_eq!(truncate("ゼルダの伝説", 7), "ゼルダ…");
    }

    #[test]
    fn pad_counts_display_cells() {
        assert_eq!(pad("abc", 5), "abc  ");
        assert_eq!(pad("é", 3), "é ");
        assert_eq!(pad("toolong", 3), "toolong");
    }
}
