//! WASM bindings для генератора Pix
//!
//! Предоставляет JavaScript API: генерация кода и QR, разбор кода,
//! предварительная проверка ключа.

use pix_core::render::{data_uri, QrOptions};
use pix_core::{Parser, PixRequest};
use wasm_bindgen::prelude::*;

/// Инициализация panic hook и логирования
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
    log::info!("Pix WASM module initialized");
}

/// JavaScript-доступный генератор Pix
#[wasm_bindgen]
pub struct WasmPixGenerator {
    parser: Parser,
    options: QrOptions,
}

#[wasm_bindgen]
impl WasmPixGenerator {
    /// Создание генератора с настройками QR по умолчанию
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            options: QrOptions::default(),
        }
    }

    /// Генератор с заданным размером модуля QR (в пикселях)
    #[wasm_bindgen(js_name = withModuleSize)]
    pub fn with_module_size(module_size: u32) -> Self {
        Self {
            parser: Parser::new(),
            options: QrOptions::png(module_size),
        }
    }

    /// Генерация кода Pix и QR
    ///
    /// @param request - { keyType, keyValue, merchantName, merchantCity, amount?, tid?, description? }
    /// @returns { pixCode, qrCode } где qrCode - data URI PNG
    #[wasm_bindgen(js_name = generate)]
    pub fn generate(&self, request: JsValue) -> Result<JsValue, JsError> {
        let request: PixRequest = serde_wasm_bindgen::from_value(request)
            .map_err(|e| JsError::new(&e.to_string()))?;

        let generated = pix_core::generate(&request, &self.options)
            .map_err(|e| JsError::new(&e.to_string()))?;

        serde_wasm_bindgen::to_value(&generated).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Разбор кода Pix ("copia e cola")
    ///
    /// @returns Payload с ключом, получателем, суммой и деревом полей
    #[wasm_bindgen(js_name = decode)]
    pub fn decode(&self, pix_code: &str) -> Result<JsValue, JsError> {
        let payload = self
            .parser
            .decode(pix_code)
            .map_err(|e| JsError::new(&e.to_string()))?;

        serde_wasm_bindgen::to_value(&payload).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Проверка ключа до генерации
    ///
    /// @returns нормализованное значение ключа
    #[wasm_bindgen(js_name = validateKey)]
    pub fn validate_key(&self, key_type: &str, key_value: &str) -> Result<String, JsError> {
        self.parser
            .validate(key_type, key_value)
            .map(|key| key.value().to_string())
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// QR для уже готового кода
    #[wasm_bindgen(js_name = renderQrCode)]
    pub fn render_qr_code(&self, pix_code: &str) -> Result<String, JsError> {
        data_uri(pix_code, &self.options).map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for WasmPixGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Удобная функция для генерации одним вызовом
#[wasm_bindgen(js_name = generatePixCode)]
pub fn generate_pix_code(request: JsValue) -> Result<JsValue, JsError> {
    WasmPixGenerator::new().generate(request)
}

/// Удобная функция для разбора одним вызовом
#[wasm_bindgen(js_name = decodePixCode)]
pub fn decode_pix_code(pix_code: &str) -> Result<JsValue, JsError> {
    WasmPixGenerator::new().decode(pix_code)
}

/// Проверка ключа одним вызовом
#[wasm_bindgen(js_name = validatePixKey)]
pub fn validate_pix_key(key_type: &str, key_value: &str) -> Result<String, JsError> {
    WasmPixGenerator::new().validate_key(key_type, key_value)
}

/// QR для готового кода с заданным размером модуля
#[wasm_bindgen(js_name = renderQrCode)]
pub fn render_qr_code(pix_code: &str, module_size: u32) -> Result<String, JsError> {
    WasmPixGenerator::with_module_size(module_size).render_qr_code(pix_code)
}

/// Информация о версии
#[wasm_bindgen(js_name = version)]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
