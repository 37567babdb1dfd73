//! 章节分割器
//!
//! 按有序的章节标题模式切分小说正文：
//! 1. `第X章` 中文编号
//! 2. `Chapter N`
//! 3. 纯数字列表 `1.` / `1、`
//!
//! 第一个匹配数量超过 1 的模式胜出；都不满足时整篇作为一个章节。

use regex::Regex;
use std::sync::LazyLock;

/// 无法识别章节时使用的章节标题（full text）
pub const FULL_TEXT_TITLE: &str = "全文";

/// 标题后的分隔符只允许空格、制表符和冒号，不跨行
static HEADING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?m)^第[一二三四五六七八九十百千零〇0-9]+章[ \t:：]*(.*?)$",
        r"(?m)^Chapter[ \t]+(\d+)[ \t:：]*(.*?)$",
        r"(?m)^[0-9]+[ \t.、]+(.*?)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// 切分出的章节片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDraft {
    /// 从 1 开始的章节序号
    pub number: u32,
    pub title: String,
    pub content: String,
    pub word_count: usize,
}

/// 统计字数
///
/// 取空白分词数与 CJK 字符数（U+4E00..=U+9FFF）中较大者
pub fn count_words(text: &str) -> usize {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }

    let tokens = text.split_whitespace().count();
    let cjk = text
        .chars()
        .filter(|c| ('\u{4E00}'..='\u{9FFF}').contains(c))
        .count();

    tokens.max(cjk)
}

/// 切分章节
///
/// 对去除首尾空白后的正文依次尝试标题模式；每个章节的正文从标题结束处
/// 延伸到下一个标题开始处（或全文结束）。
pub fn split_chapters(content: &str) -> Vec<ChapterDraft> {
    let text = content.trim();

    for pattern in HEADING_PATTERNS.iter() {
        let headings: Vec<_> = pattern.find_iter(text).collect();
        if headings.len() <= 1 {
            continue;
        }

        return headings
            .iter()
            .enumerate()
            .map(|(i, heading)| {
                let body_end = headings
                    .get(i + 1)
                    .map(|next| next.start())
                    .unwrap_or(text.len());
                let body = text[heading.end()..body_end].trim().to_string();

                ChapterDraft {
                    number: (i + 1) as u32,
                    title: heading.as_str().trim().to_string(),
                    word_count: count_words(&body),
                    content: body,
                }
            })
            .collect();
    }

    vec![ChapterDraft {
        number: 1,
        title: FULL_TEXT_TITLE.to_string(),
        content: text.to_string(),
        word_count: count_words(content),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_words_cjk() {
        assert_eq!(count_words("张三走进房间"), 6);
    }

    #[test]
    fn test_count_words_latin() {
        assert_eq!(count_words("  the quick brown fox  "), 4);
    }

    #[test]
    fn test_count_words_mixed_takes_larger() {
        // 3 个空白分词，6 个汉字
        assert_eq!(count_words("你好 世界 abc啊啊"), 6);
        assert_eq!(count_words("one two three 四"), 4);
        assert_eq!(count_words("   "), 0);
    }

    #[test]
    fn test_chinese_headings() {
        let text = "第一章 初遇\n张三在路上遇见李四。\n\n第二章 重逢\n多年后两人再次相见。\n第三章：离别\n终于分开。";
        let chapters = split_chapters(text);

        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].title, "第一章 初遇");
        assert_eq!(chapters[0].content, "张三在路上遇见李四。");
        assert_eq!(chapters[1].title, "第二章 重逢");
        assert_eq!(chapters[2].title, "第三章：离别");
        assert_eq!(chapters[2].content, "终于分开。");

        let numbers: Vec<u32> = chapters.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_heading_without_title_does_not_swallow_next_line() {
        let text = "第1章\n正文一。\n第2章\n正文二。";
        let chapters = split_chapters(text);

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "第1章");
        assert_eq!(chapters[0].content, "正文一。");
    }

    #[test]
    fn test_english_headings() {
        let text = "Chapter 1: Start\nOnce upon a time.\nChapter 2 End\nThe end.";
        let chapters = split_chapters(text);

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "Chapter 1: Start");
        assert_eq!(chapters[0].content, "Once upon a time.");
        assert_eq!(chapters[1].content, "The end.");
    }

    #[test]
    fn test_numeric_list_headings() {
        let text = "1. 开端\n故事开始。\n2、发展\n故事继续。";
        let chapters = split_chapters(text);

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[1].title, "2、发展");
    }

    #[test]
    fn test_earlier_pattern_wins() {
        // 中文标题有两个匹配，数字列表也有两个匹配，中文模式优先
        let text = "第一章 甲\n1. 条目\n第二章 乙\n2. 条目";
        let chapters = split_chapters(text);

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].content, "1. 条目");
    }

    #[test]
    fn test_single_heading_falls_back_to_full_text() {
        let text = "第一章 唯一的一章\n这里是所有的正文内容。";
        let chapters = split_chapters(text);

        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, FULL_TEXT_TITLE);
        assert_eq!(chapters[0].word_count, count_words(text));
    }

    #[test]
    fn test_contents_reconstruct_post_heading_text() {
        let text = "前言部分\n第一章 A\n甲乙丙\n第二章 B\n丁戊己";
        let chapters = split_chapters(text);
        let joined: String = chapters.iter().map(|c| c.content.as_str()).collect();

        assert_eq!(joined, "甲乙丙丁戊己");
    }
}
