//! Builders for raw test messages.

#![allow(dead_code)]

/// Builder for a single-part UTF-8 RFC 822 message.
pub struct RawEmailBuilder {
    subject: String,
    from: String,
    date: String,
    body: String,
}

impl RawEmailBuilder {
    pub fn new() -> Self {
        Self {
            subject: "本周行业动态".to_string(),
            from: "资讯中心 <news@example.com>".to_string(),
            date: "Mon, 12 Oct 2026 09:30:00 +0800".to_string(),
            body: "市场简讯与行业新闻摘要。".to_string(),
        }
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    pub fn from(mut self, from: &str) -> Self {
        self.from = from.to_string();
        self
    }

    pub fn date(mut self, date: &str) -> Self {
        self.date = date.to_string();
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn build(self) -> Vec<u8> {
        format!(
            "From: {}\r\n\
             To: me@example.com\r\n\
             Subject: {}\r\n\
             Date: {}\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Transfer-Encoding: 8bit\r\n\
             \r\n\
             {}\r\n",
            self.from, self.subject, self.date, self.body
        )
        .into_bytes()
    }
}

/// A newsletter-style message.
pub fn news_email() -> Vec<u8> {
    RawEmailBuilder::new().build()
}

/// A message the keyword runtime classifies as a task.
pub fn task_email() -> Vec<u8> {
    RawEmailBuilder::new()
        .subject("项目进度汇报")
        .from("张经理 <zhang@example.com>")
        .body("请在周五前提交本季度的项目进度汇报。")
        .build()
}

/// Plain ASCII message whose subject varies by `n`.
pub fn numbered_email(n: u32) -> Vec<u8> {
    RawEmailBuilder::new()
        .subject(&format!("Digest #{}", n))
        .from("digest@example.com")
        .body(&format!("Issue {} of the weekly digest.", n))
        .build()
}
