// Prompt constants for AI-assisted template authoring.
// The generated template must itself carry the two report placeholders,
// so this prompt uses its own `{chapter_name}` / `{example_documents}` slots.

/// System prompt for style analysis.
pub const ANALYSIS_SYSTEM: &str =
    "你是一位专业的提示词工程师，擅长分析文档风格并生成高质量的 AI 提示词模板。";

/// Style-analysis prompt. Replace `{chapter_name}` and `{example_documents}`.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"请分析以下"{chapter_name}"章节的多个示例文档，并生成一个完整的 prompt 模板。

# 示例文档

{example_documents}

# 分析任务

请仔细分析以上示例，提取以下特征：

1. **写作风格和语气**：正式程度、专业性、语言特点
2. **内容组织结构**：标题层级、段落组织、逻辑顺序
3. **数据呈现方式**：表格格式、列表形式
4. **必须包含的关键信息点**：哪些内容是必不可少的
5. **篇幅和详细程度**：内容的详细程度、篇幅控制
6. **格式规范**：Markdown 使用规范、表格格式要求

# 生成要求

基于以上分析，请生成两个部分：

## 1. system_prompt
设定 AI 的角色、能力和基本要求，包括专业身份定位、主要职责和基本的写作要求。

## 2. user_prompt_template
具体的任务指令模板。必须包括：
- 明确的任务描述
- 详细的格式要求（基于示例分析）
- 关键信息点的列举
- 数据呈现规范
- **重要**：必须包含 `{data_summary}` 占位符（用于插入数据摘要）
- **重要**：必须包含 `{examples_text}` 占位符（用于插入参考示例）
- 质量要求和注意事项

# 输出格式

请严格按照以下 JSON 格式输出（不要有任何额外的文字说明）：

```json
{
  "system_prompt": "你的 system_prompt 内容...",
  "user_prompt_template": "你的 user_prompt_template 内容，必须包含 {data_summary} 和 {examples_text} 占位符..."
}
```

注意：
1. 输出必须是有效的 JSON 格式
2. user_prompt_template 中必须包含 `{data_summary}` 和 `{examples_text}` 两个占位符
3. 基于示例的实际风格生成，不要泛泛而谈
4. 确保生成的 prompt 能够引导 AI 生成与示例风格一致的内容"#;

/// Fills the analysis prompt. Example text goes in last so braces inside
/// the documents are never treated as slots.
pub fn analysis_prompt(chapter_name: &str, example_documents: &str) -> String {
    ANALYSIS_PROMPT_TEMPLATE
        .replace("{chapter_name}", chapter_name)
        .replace("{example_documents}", example_documents)
}
