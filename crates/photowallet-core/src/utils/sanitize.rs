//! 文件名与 ID 净化工具

/// 导入时保存的显示名称：去掉路径部分和控制字符
pub fn sanitize_display_name(input: &str) -> String {
    let base = input
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(input);

    let mut out = String::with_capacity(base.len().min(180));
    for c in base.trim().chars() {
        if c.is_control() {
            continue;
        }
        out.push(c);
        if out.len() >= 180 {
            break;
        }
    }

    if out.is_empty() {
        "photo".to_string()
    } else {
        out
    }
}

/// 导出时使用的文件名：替换文件系统不允许的字符
pub fn sanitize_file_name(input: &str) -> String {
    let out: String = input
        .chars()
        .map(|c| {
            if matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') {
                '_'
            } else {
                c
            }
        })
        .collect();
    out.trim().to_string()
}

/// 照片 ID 格式检查（非空，不含路径分隔符）
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.contains('/') && !id.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_strips_path() {
        assert_eq!(sanitize_display_name("../../etc/cat.jpg"), "cat.jpg");
        assert_eq!(sanitize_display_name("C:\\Users\\me\\dog.png"), "dog.png");
        assert_eq!(sanitize_display_name("a\u{0007}b.jpg"), "ab.jpg");
    }

    #[test]
    fn display_name_never_empty() {
        assert_eq!(sanitize_display_name("   "), "photo");
        assert_eq!(sanitize_display_name("dir/"), "photo");
    }

    #[test]
    fn file_name_replaces_forbidden_chars() {
        assert_eq!(sanitize_file_name(" a:b*c?.jpg "), "a_b_c_.jpg");
    }

    #[test]
    fn id_validation() {
        assert!(is_valid_id("0b7c1c0e-1b6f-4a57-9a55-0d3f8f7a7d10"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("../x"));
    }
}
