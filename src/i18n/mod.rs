//! Locale table for prompt localization.
//!
//! The completion service is asked to answer in the configured language,
//! and the preamble's exemplar reply is shown in that language so the
//! model mirrors it.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;

/// Target language for generated commit messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    /// English.
    #[default]
    En,
    /// German.
    De,
    /// Spanish.
    Es,
    /// French.
    Fr,
    /// Italian.
    It,
    /// Japanese.
    Ja,
    /// Korean.
    Ko,
    /// Brazilian Portuguese.
    PtBr,
    /// Russian.
    Ru,
    /// Simplified Chinese.
    ZhCn,
}

impl Language {
    /// The language's own name, as used in the prompt instruction.
    pub fn local_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::De => "Deutsch",
            Self::Es => "español",
            Self::Fr => "français",
            Self::It => "italiano",
            Self::Ja => "日本語",
            Self::Ko => "한국어",
            Self::PtBr => "português brasileiro",
            Self::Ru => "русский",
            Self::ZhCn => "简体中文",
        }
    }

    /// Exemplar fix-type commit line for the preamble.
    pub(crate) fn example_fix(self) -> &'static str {
        match self {
            Self::En => "fix(server.ts): change port variable case from lowercase port to uppercase PORT",
            Self::De => "fix(server.ts): ändere die Schreibweise der Port-Variable von port zu PORT",
            Self::Es => "fix(server.ts): cambia la variable port de minúsculas a mayúsculas PORT",
            Self::Fr => "fix(server.ts): change la casse de la variable port en PORT majuscule",
            Self::It => "fix(server.ts): cambia la variabile port da minuscolo a maiuscolo PORT",
            Self::Ja => "fix(server.ts): ポート変数を小文字の port から大文字の PORT に変更",
            Self::Ko => "fix(server.ts): 포트 변수를 소문자 port에서 대문자 PORT로 변경",
            Self::PtBr => "fix(server.ts): altera a variável port de minúsculas para maiúsculas PORT",
            Self::Ru => "fix(server.ts): изменяет регистр переменной port на PORT",
            Self::ZhCn => "fix(server.ts): 将端口变量从小写 port 改为大写 PORT",
        }
    }

    /// Exemplar feat-type commit line for the preamble.
    pub(crate) fn example_feat(self) -> &'static str {
        match self {
            Self::En => "feat(server.ts): add support for process.env.PORT environment variable",
            Self::De => "feat(server.ts): unterstütze die Umgebungsvariable process.env.PORT",
            Self::Es => "feat(server.ts): añade soporte para la variable de entorno process.env.PORT",
            Self::Fr => "feat(server.ts): ajoute la prise en charge de la variable d'environnement process.env.PORT",
            Self::It => "feat(server.ts): aggiunge il supporto per la variabile d'ambiente process.env.PORT",
            Self::Ja => "feat(server.ts): 環境変数 process.env.PORT のサポートを追加",
            Self::Ko => "feat(server.ts): process.env.PORT 환경 변수 지원 추가",
            Self::PtBr => "feat(server.ts): adiciona suporte à variável de ambiente process.env.PORT",
            Self::Ru => "feat(server.ts): добавляет поддержку переменной окружения process.env.PORT",
            Self::ZhCn => "feat(server.ts): 添加对 process.env.PORT 环境变量的支持",
        }
    }

    /// Exemplar rationale paragraph for the preamble, when descriptions
    /// are enabled.
    pub(crate) fn example_description(self) -> &'static str {
        match self {
            Self::En => "The port variable is now named PORT, which improves consistency with the naming conventions as PORT is a constant. Support for an environment variable allows the application to run on any port specified via process.env.PORT.",
            Self::De => "Die Port-Variable heißt jetzt PORT und folgt damit der Namenskonvention für Konstanten. Durch die Umgebungsvariable kann die Anwendung auf jedem über process.env.PORT angegebenen Port laufen.",
            Self::Es => "La variable de puerto ahora se llama PORT, lo que mejora la coherencia con las convenciones de nomenclatura para constantes. El soporte de la variable de entorno permite ejecutar la aplicación en cualquier puerto indicado mediante process.env.PORT.",
            Self::Fr => "La variable de port s'appelle désormais PORT, ce qui respecte la convention de nommage des constantes. La variable d'environnement permet à l'application de s'exécuter sur n'importe quel port indiqué via process.env.PORT.",
            Self::It => "La variabile della porta ora si chiama PORT, in linea con la convenzione di denominazione delle costanti. La variabile d'ambiente consente all'applicazione di usare qualsiasi porta indicata tramite process.env.PORT.",
            Self::Ja => "ポート変数は PORT という名前になり、定数の命名規則に沿うようになりました。環境変数のサポートにより、process.env.PORT で指定した任意のポートでアプリケーションを実行できます。",
            Self::Ko => "포트 변수가 PORT로 이름이 바뀌어 상수 명명 규칙과 일관성이 높아졌습니다. 환경 변수 지원으로 process.env.PORT에 지정된 어떤 포트에서도 애플리케이션을 실행할 수 있습니다.",
            Self::PtBr => "A variável de porta agora se chama PORT, em linha com a convenção de nomenclatura para constantes. O suporte à variável de ambiente permite executar a aplicação em qualquer porta indicada em process.env.PORT.",
            Self::Ru => "Переменная порта теперь называется PORT, что соответствует соглашению об именовании констант. Поддержка переменной окружения позволяет запускать приложение на любом порту, указанном в process.env.PORT.",
            Self::ZhCn => "端口变量现在命名为 PORT，与常量命名约定保持一致。环境变量的支持让应用可以运行在 process.env.PORT 指定的任意端口上。",
        }
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "en" | "english" => Ok(Self::En),
            "de" | "german" => Ok(Self::De),
            "es" | "spanish" => Ok(Self::Es),
            "fr" | "french" => Ok(Self::Fr),
            "it" | "italian" => Ok(Self::It),
            "ja" | "japanese" => Ok(Self::Ja),
            "ko" | "korean" => Ok(Self::Ko),
            "pt-br" | "portuguese" => Ok(Self::PtBr),
            "ru" | "russian" => Ok(Self::Ru),
            "zh-cn" | "chinese" => Ok(Self::ZhCn),
            other => bail!("unsupported language: {other}"),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.local_name())
    }
}
