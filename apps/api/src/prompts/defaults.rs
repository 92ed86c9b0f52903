//! Built-in chapters and prompt templates of the default project.

use chrono::Utc;

use crate::models::project::Chapter;
use crate::models::template::{PromptTemplate, TemplateSet};

/// Chapters of the monthly social-governance event report, in order.
pub const DEFAULT_CHAPTERS: &[(&str, &str)] = &[
    ("chapter_1", "一、全区社会治理基本情况"),
    ("chapter_2", "二、高频社会治理问题隐患分析研判"),
    ("chapter_3", "三、社情民意热点问题分析预警"),
    ("chapter_4", "四、事件处置解决情况分析"),
];

struct CanonicalTemplate {
    chapter: &'static str,
    system_prompt: &'static str,
    user_prompt_template: &'static str,
}

const CANONICAL_TEMPLATES: &[CanonicalTemplate] = &[
    CanonicalTemplate {
        chapter: "chapter_1",
        system_prompt: "你是一位专业的社会治理数据分析师，擅长撰写规范的政府工作报告，能够准确解读事件数据并用结构化语言呈现分析结果。",
        user_prompt_template: "请根据以下数据生成结构完整的《一、全区社会治理基本情况》章节。

# 数据
{data_summary}

# 输出结构
## （一）总体概况
- 用 3~4 句总结当月事件总量、环比变化、高价值事件情况等核心结论。

## （二）事件流转与办结情况
- 使用 Markdown 表格呈现关键指标：
| 平台/渠道 | 指标 | 一级 | 二级 | 三级 | 四级 | 五级 | 合计 | 办结率 |
|-----------|------|------|------|------|------|------|------|--------|
| 基层智治平台 | 总数 | …… | …… | …… | …… | …… | …… | …… |
| 网格上报 | 总数 | …… | …… | …… | …… | …… | …… | …… |
| 12345热线 | 总数 | …… | …… | …… | …… | …… | …… | …… |
| 合计 | 总数 | …… | …… | …… | …… | …… | …… | …… |

## （三）问题研判与亮点做法
- 总结数据反映出的亮点和短板，各列 2~3 条要点。

## （四）下一步工作建议
- 至少列出 3 条建议，以“• 责任单位：…｜措施：…｜时限：…”格式呈现。

# 写作要求
- 保持正式、公文化的语言，逻辑清晰。
- 数据引用准确，表格使用标准 Markdown 语法。
- 建议具体可执行。

{examples_text}",
    },
    CanonicalTemplate {
        chapter: "chapter_2",
        system_prompt: "你是一位资深社会治理风险分析师，擅长对高频社会治理问题和隐患进行研判、分级预警并提出针对性化解举措。请保持正式、专业的政府公文语气，逻辑清晰、数据准确。",
        user_prompt_template: "请根据以下数据生成结构完整的《二、高频社会治理问题隐患分析研判》章节。

# 数据
{data_summary}

# 输出结构
## （一）总体态势
- 概括本月高频问题总量、占比及环比变化。
- 使用 Markdown 表格呈现关键指标：
| 问题类型 | 当月数量 | 占比 | 环比 | 风险等级 | 主要诉求 |
|----------|----------|------|------|----------|----------|
| …… | …… | …… | …… | …… | …… |

## （二）重点问题风险研判
针对每个主要问题类型，使用“### 1. ……问题”格式展开：数据概览、风险研判（成因、影响范围、潜在风险等级）、典型案例。

## （三）预警与治理建议
- • 责任单位：……｜措施：……｜时限：……

## （四）综合评估与下一步工作
- 总结整体风险态势、突出问题与下一阶段重点工作方向。

# 写作要求
- 语言正式、客观；数据与分析对应一致，不得重复。
- 表格使用标准 Markdown 语法，缺失数据用“/”。

{examples_text}",
    },
    CanonicalTemplate {
        chapter: "chapter_3",
        system_prompt: "你是一位专业的舆情研判分析师，擅长基于民意数据进行热点风险预警。请保持政府公文风格，做到结构严谨、数据准确、语言精炼。",
        user_prompt_template: "请根据以下数据生成结构完整的《三、社情民意热点问题分析预警》章节。

# 数据
{data_summary}

# 输出结构
## （一）总体态势
- 概括整体诉求热点和波动趋势，列出关键数据。

## （二）热点问题研判
#### 1. ……热点问题
- 数据概览：……
- 风险研判：……（成因、影响范围、风险等级）
- 典型案例：……

## （三）预警建议
- • 责任单位：……｜措施：……｜时限：……

## （四）综合研判结论
- 总结整体风险态势与下一步预警重点。

# 写作要求
- 语言正式、精炼；数据准确。

{examples_text}",
    },
    CanonicalTemplate {
        chapter: "chapter_4",
        system_prompt: "你是一位专业的政府工作报告撰写专家，专注于事件处置解决情况分析。请保持正式、规范的公文语气，善于总结问题并提出可操作的建议。",
        user_prompt_template: "请根据以下数据生成结构完整的《四、事件处置解决情况分析》章节。

# 数据
{data_summary}

# 输出结构
## （一）总体处置情况
- 概述事件办结数量、办结率、环比变化等核心指标，指出亮点与短板。

## （二）重点单位（镇街）处置表现
- 使用 Markdown 表格列出关键单位办结量、办结率、环比变化。

## （三）积案治理进展
- 描述新增积案、办结积案、存量积案情况，对主要积案类型进行分析。

## （四）存在的突出问题
- 列出 2~3 条主要问题，说明表现与影响。

## （五）下一步工作建议
- 至少给出 3 条建议，格式为“• 责任单位：……｜措施：……｜时限：……”。

# 写作要求
- 语言正式、客观；建议具体可操作。

{examples_text}",
    },
];

pub fn default_chapters() -> Vec<Chapter> {
    DEFAULT_CHAPTERS
        .iter()
        .zip(0u32..)
        .map(|((id, title), order)| Chapter {
            id: id.to_string(),
            title: title.to_string(),
            order,
        })
        .collect()
}

/// Chapter title without the leading `一、` style ordinal.
pub fn display_name(title: &str) -> &str {
    title.split_once('、').map(|(_, rest)| rest).unwrap_or(title)
}

/// Id reserved for the built-in template of a chapter.
pub fn canonical_template_id(chapter: &str) -> String {
    format!("default_{chapter}")
}

/// The built-in template for a default chapter, marked as default.
pub fn canonical_template(chapter: &str) -> Option<PromptTemplate> {
    let canonical = CANONICAL_TEMPLATES.iter().find(|t| t.chapter == chapter)?;
    let title = DEFAULT_CHAPTERS
        .iter()
        .find(|(id, _)| *id == chapter)
        .map(|(_, title)| *title)
        .unwrap_or(chapter);
    let now = Utc::now();

    Some(PromptTemplate {
        id: canonical_template_id(chapter),
        name: format!("默认模板 - {}", display_name(title)),
        chapter: chapter.to_string(),
        system_prompt: canonical.system_prompt.to_string(),
        user_prompt_template: canonical.user_prompt_template.to_string(),
        is_default: true,
        created_at: now,
        updated_at: now,
    })
}

/// One built-in template per default chapter.
pub fn default_template_set() -> TemplateSet {
    DEFAULT_CHAPTERS
        .iter()
        .filter_map(|(id, _)| canonical_template(id).map(|t| (id.to_string(), vec![t])))
        .collect()
}
