use serde::{Deserialize, Deserializer, Serialize};

// ─── Payload ─────────────────────────────────────────────────────

/// contentUrl から取得する認識結果ペイロード（必要なフィールドのみ）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionPayload {
    #[serde(rename = "recognizedPhrases")]
    pub recognized_phrases: Vec<RecognizedPhrase>,
}

/// 認識フレーズ。並び順は時系列で意味を持つ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedPhrase {
    /// 話者ID。サービスは数値で返すので文字列に正規化する。
    #[serde(
        default,
        deserialize_with = "speaker_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub speaker: Option<String>,
    #[serde(default, rename = "nBest")]
    pub n_best: Vec<NBest>,
}

/// 認識候補
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NBest {
    #[serde(default)]
    pub display: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSpeaker {
    Number(i64),
    Text(String),
}

fn speaker_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawSpeaker>::deserialize(deserializer)?;
    Ok(raw.map(|r| match r {
        RawSpeaker::Number(n) => n.to_string(),
        RawSpeaker::Text(s) => s,
    }))
}

impl RecognizedPhrase {
    pub fn new(speaker: Option<&str>, display: &str) -> Self {
        Self {
            speaker: speaker.map(str::to_string),
            n_best: vec![NBest {
                display: display.to_string(),
            }],
        }
    }

    /// 最上位候補の表示テキスト。候補が無ければ空文字。
    pub fn display_text(&self) -> &str {
        self.n_best.first().map(|n| n.display.as_str()).unwrap_or("")
    }
}

// ─── Formatting ──────────────────────────────────────────────────

/// 整形オプション
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// speaker が無いフレーズに使うラベル
    pub unknown_speaker_label: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            unknown_speaker_label: "unknown".to_string(),
        }
    }
}

/// 同一話者が連続した区間の文のまとまり。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerBlock {
    pub speaker: String,
    /// 区間番号 (1 始まり)。同じ話者が再登場すると別番号になる。
    pub run_index: u32,
    pub sentences: Vec<String>,
}

impl SpeakerBlock {
    pub fn render(&self) -> String {
        format!("[speaker {}]\n{}", self.speaker, self.sentences.join("\n"))
    }
}

fn is_sentence_terminal(c: char) -> bool {
    matches!(c, '。' | '！' | '？')
}

/// 「。」「！」「？」の直後で分割し、前後の空白を除いて空の断片を捨てる。
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split_inclusive(is_sentence_terminal)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 話者ごとの連続区間に分けるリデューサ。
///
/// 生きているアキュムレータは常に1つだけで、話者が変わった時点と
/// 入力の終わりでちょうど1回ずつ確定 (flush) する。
pub struct TranscriptFormatter<'a> {
    options: &'a FormatOptions,
    previous_speaker: Option<String>,
    run_index: u32,
    current: Vec<String>,
    finished: Vec<SpeakerBlock>,
}

impl<'a> TranscriptFormatter<'a> {
    pub fn new(options: &'a FormatOptions) -> Self {
        Self {
            options,
            previous_speaker: None,
            run_index: 0,
            current: Vec::new(),
            finished: Vec::new(),
        }
    }

    pub fn push(&mut self, phrase: &RecognizedPhrase) {
        let options = self.options;
        let speaker = phrase
            .speaker
            .as_deref()
            .unwrap_or(options.unknown_speaker_label.as_str());
        let sentences = split_sentences(phrase.display_text());

        if self.previous_speaker.as_deref() == Some(speaker) {
            self.current.extend(sentences);
            return;
        }

        self.flush();
        self.run_index += 1;
        self.previous_speaker = Some(speaker.to_string());
        self.current = sentences;
    }

    fn flush(&mut self) {
        if let Some(speaker) = self.previous_speaker.take() {
            self.finished.push(SpeakerBlock {
                speaker,
                run_index: self.run_index,
                sentences: std::mem::take(&mut self.current),
            });
        }
    }

    /// 残っている区間を確定してブロック列を返す。
    pub fn finish(mut self) -> Vec<SpeakerBlock> {
        self.flush();
        self.finished
    }
}

/// フレーズ列を話者ブロックに分ける。
pub fn group_by_speaker(phrases: &[RecognizedPhrase], options: &FormatOptions) -> Vec<SpeakerBlock> {
    let mut formatter = TranscriptFormatter::new(options);
    for phrase in phrases {
        formatter.push(phrase);
    }
    formatter.finish()
}

/// ブロックを空行区切りで連結する。
pub fn render_blocks(blocks: &[SpeakerBlock]) -> String {
    blocks
        .iter()
        .map(SpeakerBlock::render)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 認識フレーズ列を話者ごとの読みやすいテキストに整形する。
pub fn format_transcript(phrases: &[RecognizedPhrase], options: &FormatOptions) -> String {
    render_blocks(&group_by_speaker(phrases, options))
}
