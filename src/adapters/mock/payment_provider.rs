use crate::domain::value_objects::PaymentSessionId;
use crate::ports::payment_provider::{
    CheckoutSession, PaymentProvider as PaymentProviderTrait, ProviderSession,
    ProviderSessionStatus, Result,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

/// PaymentProviderのインメモリ実装
///
/// セッションIDを連番で払い出し、テスト側が`complete_session`で
/// プロバイダ側の決済完了を模倣する。`fail_creation`を立てると
/// セッション作成が失敗し、上流障害のパスを再現できる。
#[allow(dead_code)]
pub struct PaymentProvider {
    sessions: Mutex<HashMap<String, ProviderSession>>,
    counter: Mutex<u64>,
    fail_creation: Mutex<bool>,
}

#[allow(dead_code)]
impl PaymentProvider {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            counter: Mutex::new(0),
            fail_creation: Mutex::new(false),
        }
    }

    /// テスト用にセッション作成を失敗させる
    pub fn set_fail_creation(&self, fail: bool) {
        *self.fail_creation.lock().unwrap() = fail;
    }

    /// テスト用にプロバイダ側の決済完了を模倣する
    pub fn complete_session(&self, session_id: &PaymentSessionId) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(session_id.as_str()) {
            session.status = ProviderSessionStatus::Completed;
            session.transaction_id = Some(format!("txn_{}", session_id.as_str()));
        }
    }

    /// テスト用にプロバイダ側のセッション失効を模倣する
    pub fn expire_session(&self, session_id: &PaymentSessionId) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(session_id.as_str()) {
            session.status = ProviderSessionStatus::Expired;
        }
    }

    /// テスト用に作成されたセッション数を数える
    pub fn created_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

impl Default for PaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProviderTrait for PaymentProvider {
    async fn create_checkout_session(
        &self,
        amount: Decimal,
        _currency: &str,
        _success_url: &str,
        _cancel_url: &str,
        _metadata: &serde_json::Value,
    ) -> Result<CheckoutSession> {
        if *self.fail_creation.lock().unwrap() {
            return Err("payment provider unavailable".into());
        }

        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let id = format!("sess_{}", *counter);

        self.sessions.lock().unwrap().insert(
            id.clone(),
            ProviderSession {
                status: ProviderSessionStatus::Open,
                transaction_id: None,
                amount,
            },
        );

        Ok(CheckoutSession {
            session_id: PaymentSessionId::new(id.clone()),
            redirect_url: format!("https://pay.example.com/checkout/{}", id),
        })
    }

    async fn retrieve_session(
        &self,
        session_id: &PaymentSessionId,
    ) -> Result<Option<ProviderSession>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(session_id.as_str())
            .cloned())
    }
}
